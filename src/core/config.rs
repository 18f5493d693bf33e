//! # Global pipeline configuration.
//!
//! Provides [`Config`] (and the nested [`BusConfig`]) centralized settings for the
//! pipeline runtime.
//!
//! Config is used in three ways:
//! 1. **Bus creation**: `Bus::new(config.bus.clone())`
//! 2. **Scheduler defaults**: `default_interval_secs` for tasks registered without an interval
//! 3. **Shutdown**: `stop_timeout` / `drain_timeout` bound the teardown sequence
//!
//! ## Overrides
//! [`Config::apply`] takes a [`Settings`] map and applies the recognized global keys:
//!
//! | Key                             | Field                           |
//! |---------------------------------|---------------------------------|
//! | `eventBus.queueCapacity`        | `bus.queue_capacity`            |
//! | `eventBus.failOnMissingListener`| `bus.fail_on_missing_listener`  |
//! | `shutdown.stopTimeoutMs`        | `stop_timeout`                  |
//! | `shutdown.drainTimeoutMs`       | `drain_timeout`                 |
//!
//! Malformed values keep the current value and are logged; other keys are left for the
//! scheduler.
//!
//! ## Sentinel values
//! - `queue_capacity = 0` → clamped to 1 by the bus
//! - `drain_timeout = 0s` → drain discards queued work immediately

use std::time::Duration;

use tracing::warn;

use crate::core::Settings;
use crate::error::ConfigParseError;

/// Event bus settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusConfig {
    /// Default bound of each listener queue (a registration may override it).
    ///
    /// A queue at capacity rejects the newest event, which is counted as dropped.
    pub queue_capacity: usize,

    /// Whether `publish` returns [`PublishError::NoListener`](crate::PublishError) when
    /// no listener takes the event. Unrouted events are counted either way.
    pub fail_on_missing_listener: bool,
}

impl BusConfig {
    /// Returns the queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

impl Default for BusConfig {
    /// `queue_capacity = 1024`, `fail_on_missing_listener = false`.
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            fail_on_missing_listener: false,
        }
    }
}

/// Global configuration for the pipeline runtime.
///
/// ## Field semantics
/// - `bus`: event bus queue bound and missing-listener policy
/// - `stop_timeout`: how long `Scheduler::stop` waits for tasks before abandoning them
/// - `drain_timeout`: how long `Bus::drain` waits for queues to empty (`0s` = discard now)
/// - `default_interval_secs`: interval for tasks registered without one (min 1)
///
/// All fields are public. Prefer the helper accessors to avoid repeating sentinel checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub bus: BusConfig,

    /// Upper bound for stopping scheduled tasks at shutdown.
    pub stop_timeout: Duration,

    /// Upper bound for flushing listener queues at shutdown.
    pub drain_timeout: Duration,

    /// Interval used when a task is registered with the default.
    pub default_interval_secs: u64,
}

impl Config {
    pub const QUEUE_CAPACITY_KEY: &'static str = "eventBus.queueCapacity";
    pub const FAIL_ON_MISSING_KEY: &'static str = "eventBus.failOnMissingListener";
    pub const STOP_TIMEOUT_KEY: &'static str = "shutdown.stopTimeoutMs";
    pub const DRAIN_TIMEOUT_KEY: &'static str = "shutdown.drainTimeoutMs";

    /// Returns the default interval clamped to a minimum of 1 second.
    #[inline]
    pub fn default_interval(&self) -> u64 {
        self.default_interval_secs.max(1)
    }

    /// Returns `true` if `key` is one of the global keys handled by [`apply`](Self::apply).
    pub fn is_global_key(key: &str) -> bool {
        matches!(
            key,
            Self::QUEUE_CAPACITY_KEY
                | Self::FAIL_ON_MISSING_KEY
                | Self::STOP_TIMEOUT_KEY
                | Self::DRAIN_TIMEOUT_KEY
        )
    }

    /// Applies one global key.
    ///
    /// On error the field is left untouched.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigParseError> {
        let invalid = || ConfigParseError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let raw = value.trim();

        match key {
            Self::QUEUE_CAPACITY_KEY => {
                let n: usize = raw.parse().map_err(|_| invalid())?;
                if n == 0 {
                    return Err(invalid());
                }
                self.bus.queue_capacity = n;
            }
            Self::FAIL_ON_MISSING_KEY => {
                self.bus.fail_on_missing_listener = raw.parse().map_err(|_| invalid())?;
            }
            Self::STOP_TIMEOUT_KEY => {
                let ms: u64 = raw.parse().map_err(|_| invalid())?;
                self.stop_timeout = Duration::from_millis(ms);
            }
            Self::DRAIN_TIMEOUT_KEY => {
                let ms: u64 = raw.parse().map_err(|_| invalid())?;
                self.drain_timeout = Duration::from_millis(ms);
            }
            _ => {
                return Err(ConfigParseError::UnknownKey {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Applies every recognized global key from `settings`.
    ///
    /// Malformed values are logged and skipped; returns the errors that were recovered.
    pub fn apply(&mut self, settings: &Settings) -> Vec<ConfigParseError> {
        let mut errors = Vec::new();
        for (key, value) in settings.iter() {
            if !Self::is_global_key(key) {
                continue;
            }
            if let Err(err) = self.set(key, value) {
                warn!(key, value, label = err.as_label(), "ignoring configuration value");
                errors.push(err);
            }
        }
        errors
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus = BusConfig::default()` (1024 per queue, unrouted events counted only)
    /// - `stop_timeout = 5s`
    /// - `drain_timeout = 5s`
    /// - `default_interval_secs = 5`
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            stop_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(5),
            default_interval_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.bus.queue_capacity, 1024);
        assert!(!cfg.bus.fail_on_missing_listener);
        assert_eq!(cfg.stop_timeout, Duration::from_secs(5));
        assert_eq!(cfg.default_interval(), 5);
    }

    #[test]
    fn apply_keeps_previous_value_on_bad_input() {
        let mut cfg = Config::default();
        let settings = Settings::from_pairs([
            ("eventBus.queueCapacity", "64"),
            ("eventBus.failOnMissingListener", "yes"),
            ("shutdown.drainTimeoutMs", "250"),
            ("metricOutput.interval.jvm", "10"),
        ]);

        let errors = cfg.apply(&settings);
        assert_eq!(cfg.bus.queue_capacity, 64);
        assert!(!cfg.bus.fail_on_missing_listener);
        assert_eq!(cfg.drain_timeout, Duration::from_millis(250));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].as_label(), "config_invalid_value");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut cfg = Config::default();
        assert!(cfg.set(Config::QUEUE_CAPACITY_KEY, "0").is_err());
        assert_eq!(cfg.bus.queue_capacity_clamped(), 1024);
        assert!(matches!(
            cfg.set("nope", "1"),
            Err(ConfigParseError::UnknownKey { .. })
        ));
    }
}
