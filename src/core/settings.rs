//! # Flat dotted-key configuration map.
//!
//! [`Settings`] is what the host hands to the pipeline before `start()`: a flat map from
//! dotted keys (`metricOutput.interval.jvm`) to raw string values. It does no
//! interpretation; [`Config::apply`](crate::Config::apply) picks the global keys and
//! [`Scheduler::configure_all`](crate::Scheduler::configure_all) the per-task ones.
//!
//! ## Text form
//! ```text
//! # comments and blank lines are ignored
//! metricOutput.interval.jvm = 10
//! eventBus.queueCapacity=4096
//! ```

use std::collections::BTreeMap;

use tracing::warn;

/// Flat mapping of dotted keys to raw values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds settings from key/value pairs; later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { values }
    }

    /// Parses `key=value` lines.
    ///
    /// Lines without `=` or with an empty key are logged and skipped.
    pub fn parse(text: &str) -> Self {
        let mut values = BTreeMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('=') {
                Some((k, v)) if !k.trim().is_empty() => {
                    values.insert(k.trim().to_string(), v.trim().to_string());
                }
                _ => warn!(line = idx + 1, content = line, "skipping malformed settings line"),
            }
        }
        Self { values }
    }

    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Iterates in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Settings::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_and_skips_comments() {
        let s = Settings::parse(
            "# agent settings\n\
             metricOutput.interval.jvm = 10\n\
             \n\
             eventBus.queueCapacity=4096\n\
             garbage line\n\
             =nokey\n",
        );
        assert_eq!(s.len(), 2);
        assert_eq!(s.get("metricOutput.interval.jvm"), Some("10"));
        assert_eq!(s.get("eventBus.queueCapacity"), Some("4096"));
        assert_eq!(s.get("garbage line"), None);
    }

    #[test]
    fn later_pairs_win() {
        let s: Settings = [("a", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(s.get("a"), Some("2"));
    }
}
