//! # Report payload: flat key → scalar mapping.
//!
//! A [`ReportPayload`] is built fresh for every tick, tagged with a destination path
//! and an optional grouping key, and handed by value to a sink. Field insertion order
//! is irrelevant.
//!
//! ## Example
//! ```rust
//! use pulsevisor::{MetricValue, ReportPayload};
//!
//! let mut payload = ReportPayload::new("status/resources");
//! payload.insert("heap", 1024_u64);
//! payload.insert("cpu", 12.5_f64);
//! payload.insert("interval", 5_u64);
//!
//! assert_eq!(payload.get("heap"), Some(&MetricValue::UInt(1024)));
//! assert_eq!(payload.len(), 3);
//! ```

use std::collections::HashMap;
use std::fmt;

/// Scalar value carried by a report field.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::UInt(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{v}"),
            MetricValue::UInt(v) => write!(f, "{v}"),
            MetricValue::Float(v) => write!(f, "{v}"),
            MetricValue::Bool(v) => write!(f, "{v}"),
            MetricValue::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        MetricValue::Int(i64::from(v))
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::UInt(v)
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        MetricValue::UInt(u64::from(v))
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::UInt(v as u64)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        MetricValue::Float(f64::from(v))
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

/// Flat metric mapping tagged with a destination path and optional grouping key.
///
/// Ownership transfers to the sink on report; the scheduler never touches it again.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportPayload {
    path: String,
    group: Option<String>,
    fields: HashMap<String, MetricValue>,
}

impl ReportPayload {
    /// Creates an empty payload for the given destination path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            group: None,
            fields: HashMap::new(),
        }
    }

    /// Attaches a grouping key.
    #[inline]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Moves every field of `other` into this payload (later values win).
    pub fn extend<I, K>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, MetricValue)>,
        K: Into<String>,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v)));
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &HashMap<String, MetricValue> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields sorted by key, for stable log output.
    pub fn sorted_fields(&self) -> Vec<(&str, &MetricValue)> {
        let mut out: Vec<_> = self.fields.iter().map(|(k, v)| (k.as_str(), v)).collect();
        out.sort_unstable_by(|a, b| a.0.cmp(b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_values_replace_earlier_ones() {
        let mut p = ReportPayload::new("status/resources").with_group("jvm");
        p.insert("threads", 4_u64);
        p.extend([("threads", MetricValue::UInt(8)), ("cpu", MetricValue::Float(1.5))]);

        assert_eq!(p.group(), Some("jvm"));
        assert_eq!(p.get("threads"), Some(&MetricValue::UInt(8)));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn sorted_fields_are_ordered_by_key() {
        let mut p = ReportPayload::new("x");
        p.insert("b", 2_i64);
        p.insert("a", true);
        p.insert("c", "text");

        let keys: Vec<&str> = p.sorted_fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn numeric_view() {
        assert_eq!(MetricValue::from(3_u32).as_f64(), Some(3.0));
        assert_eq!(MetricValue::from(-2_i32).as_f64(), Some(-2.0));
        assert_eq!(MetricValue::from(true).as_f64(), Some(1.0));
        assert_eq!(MetricValue::from("n/a").as_f64(), None);
    }
}
