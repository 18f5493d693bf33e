//! Error types used by the pipeline runtime, scheduled tasks, collectors and listeners.
//!
//! Only registration-time errors ([`RegistrationError`]) and the policy-gated
//! [`PublishError`] are surfaced synchronously to callers. Everything else is caught at
//! the narrowest boundary (per collector, per tick, per listener) and logged/counted;
//! the types exist so those boundaries can log with a stable label.
//!
//! Every enum provides `as_label()`, a short snake_case label for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the pipeline runtime itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some tasks were still running and were abandoned.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; abandoning")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of tasks that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pulsevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors raised while registering tasks or listeners.
///
/// These are the only errors that reach the caller synchronously; each one is fatal
/// to the offending registration only.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistrationError {
    /// A scheduled task with the same name is already registered.
    #[error("task '{name}' is already registered")]
    DuplicateTask {
        /// Conflicting task name.
        name: String,
    },

    /// Interval must be a positive number of seconds.
    #[error("task '{name}' has invalid interval {secs}s (must be > 0)")]
    InvalidInterval {
        /// Task name.
        name: String,
        /// Rejected interval.
        secs: u64,
    },

    /// The scheduler has already started; the task table is frozen.
    #[error("scheduler already started; cannot register '{name}'")]
    AlreadyStarted {
        /// Task name.
        name: String,
    },

    /// Listener registration is malformed (zero parallelism, empty name, ...).
    #[error("listener '{name}' is invalid: {reason}")]
    InvalidListener {
        /// Listener name.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A listener with the same name is already subscribed.
    #[error("listener '{name}' is already subscribed")]
    DuplicateListener {
        /// Conflicting listener name.
        name: String,
    },
}

impl RegistrationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistrationError::DuplicateTask { .. } => "registration_duplicate_task",
            RegistrationError::InvalidInterval { .. } => "registration_invalid_interval",
            RegistrationError::AlreadyStarted { .. } => "registration_already_started",
            RegistrationError::InvalidListener { .. } => "registration_invalid_listener",
            RegistrationError::DuplicateListener { .. } => "registration_duplicate_listener",
        }
    }
}

/// # Errors produced while applying a configuration value.
///
/// Always recovered locally: the previous (or compiled-in default) value is retained.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigParseError {
    /// The value could not be parsed for this key.
    #[error("{key}: invalid value {value:?}")]
    InvalidValue {
        /// Dotted configuration key.
        key: String,
        /// Raw value that was rejected.
        value: String,
    },

    /// No task or setting recognizes this key.
    #[error("{key}: unknown configuration key")]
    UnknownKey {
        /// Dotted configuration key.
        key: String,
    },

    /// Configuration arrived after `start()`; intervals are immutable from then on.
    #[error("{key}: configuration is frozen after start")]
    Frozen {
        /// Dotted configuration key.
        key: String,
    },
}

impl ConfigParseError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigParseError::InvalidValue { .. } => "config_invalid_value",
            ConfigParseError::UnknownKey { .. } => "config_unknown_key",
            ConfigParseError::Frozen { .. } => "config_frozen",
        }
    }
}

/// # Errors returned by [`Bus::publish`](crate::Bus::publish).
///
/// Backpressure never shows up here: full queues drop and count.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PublishError {
    /// No subscribed listener accepted the event and the bus is configured to treat that as an error.
    #[error("no listener accepted event of type '{event_type}'")]
    NoListener {
        /// Event type that found no consumer.
        event_type: String,
    },
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::NoListener { .. } => "publish_no_listener",
        }
    }
}

/// # Failure of a single collector during one tick.
///
/// Isolated per collector: the tick proceeds with the fields of the others.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CollectorError {
    /// The collector reported an error.
    #[error("collector '{family}' failed: {reason}")]
    Failed {
        /// Metric family (e.g. "memory", "threads").
        family: String,
        /// Failure message.
        reason: String,
    },

    /// The collector panicked.
    #[error("collector '{family}' panicked: {info}")]
    Panicked {
        /// Metric family.
        family: String,
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl CollectorError {
    /// Shorthand for [`CollectorError::Failed`].
    pub fn failed(family: impl Into<String>, reason: impl Into<String>) -> Self {
        CollectorError::Failed {
            family: family.into(),
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CollectorError::Failed { .. } => "collector_failed",
            CollectorError::Panicked { .. } => "collector_panicked",
        }
    }
}

/// # Failure spanning an entire tick of a scheduled task.
///
/// Logged at the tick boundary; the next tick is unaffected.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TickError {
    /// The tick body returned an error.
    #[error("tick failed: {reason}")]
    Failed {
        /// Failure message.
        reason: String,
    },

    /// The tick body panicked.
    #[error("tick panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl TickError {
    /// Shorthand for [`TickError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        TickError::Failed {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TickError::Failed { .. } => "tick_failed",
            TickError::Panicked { .. } => "tick_panicked",
        }
    }
}

/// # Failure inside a listener's `accept` (or a callback payload it runs).
///
/// Isolated per listener instance: the worker keeps processing later events.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler reported an error.
    #[error("handler failed: {reason}")]
    Failed {
        /// Failure message.
        reason: String,
    },

    /// The handler received a payload kind it does not understand.
    #[error("unexpected payload kind '{kind}'")]
    UnexpectedPayload {
        /// Payload kind label.
        kind: &'static str,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerError::Failed {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed { .. } => "handler_failed",
            HandlerError::UnexpectedPayload { .. } => "handler_unexpected_payload",
        }
    }
}

/// # Failure of a [`ReportSink`](crate::ReportSink).
///
/// Logged by the scheduler; never aborts a tick.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReportError {
    /// The sink refused the payload.
    #[error("report '{key}' rejected: {reason}")]
    Rejected {
        /// Destination key.
        key: String,
        /// Why it was refused.
        reason: String,
    },

    /// The sink is closed (e.g. the bus is draining).
    #[error("report sink closed")]
    Closed,
}

impl ReportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReportError::Rejected { .. } => "report_rejected",
            ReportError::Closed => "report_closed",
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = RegistrationError::DuplicateTask {
            name: "processMetric".into(),
        };
        assert_eq!(err.as_label(), "registration_duplicate_task");
        assert_eq!(err.to_string(), "task 'processMetric' is already registered");

        let err = ConfigParseError::InvalidValue {
            key: "metricOutput.interval.jvm".into(),
            value: "bad".into(),
        };
        assert_eq!(err.as_label(), "config_invalid_value");
        assert!(err.to_string().contains("\"bad\""));

        assert_eq!(ReportError::Closed.as_label(), "report_closed");
        assert_eq!(TickError::failed("x").as_label(), "tick_failed");
    }

    #[test]
    fn panic_message_handles_common_payloads() {
        let p: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(p.as_ref()), "static");

        let p: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(p.as_ref()), "owned");

        let p: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(p.as_ref()), "unknown panic");
    }
}
