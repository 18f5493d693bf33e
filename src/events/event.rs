//! # Events carried by the bus.
//!
//! An [`Event`] is an immutable unit of work: an [`EventType`] discriminator used for
//! listener matching, a [`Payload`], a global sequence number and a timestamp. It is
//! created by a producer, moved into the bus and consumed exactly once by exactly one
//! listener instance.
//!
//! ## Payload kinds
//! - [`Payload::Metric`] a report payload plus its destination key
//! - [`Payload::Trace`] one finished span of an instrumented call
//! - [`Payload::Callback`] a keyed closure to run inside the consumer (fire-and-forget)
//! - [`Payload::Custom`] anything else; the bus never looks inside
//!
//! ## Example
//! ```rust
//! use pulsevisor::{Callback, Event, EventType};
//!
//! let ev = Event::callback(Callback::new("http-client", || Ok(())));
//! assert_eq!(ev.kind, EventType::REPORT);
//! assert_eq!(ev.payload.kind_label(), "callback");
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::error::HandlerError;
use crate::report::ReportPayload;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Event-type discriminator used to match events against listeners.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// Metric payloads produced by scheduled tasks.
    pub const METRIC: EventType = EventType::from_static("metric");
    /// Finished trace spans from instrumentation call-sites.
    pub const TRACE: EventType = EventType::from_static("trace");
    /// Callback payloads consumed by [`ReportListener`](crate::ReportListener).
    pub const REPORT: EventType = EventType::from_static("report");

    /// Creates an event type from a static string without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        EventType(Cow::Borrowed(name))
    }

    /// Creates an event type from an owned name.
    pub fn new(name: impl Into<String>) -> Self {
        EventType(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        EventType::from_static(name)
    }
}

/// Kind of instrumented call a trace span came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceType {
    DubboClient,
    DubboServer,
    MqPublish,
    MqConsume,
    CustomMark,
    HttpServer,
    HttpClient,
}

impl TraceType {
    /// Stable key used in reports.
    pub fn key(&self) -> &'static str {
        match self {
            TraceType::DubboClient => "dubbo-client",
            TraceType::DubboServer => "dubbo-server",
            TraceType::MqPublish => "mq-publish",
            TraceType::MqConsume => "mq-consume",
            TraceType::CustomMark => "custom-mark",
            TraceType::HttpServer => "http-server",
            TraceType::HttpClient => "http-client",
        }
    }
}

/// One finished span reported by an instrumentation call-site.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub trace_type: TraceType,
    /// Trace identifier; spans of one trace share it (natural shard key).
    pub trace_id: Arc<str>,
    /// Operation name (endpoint, topic, method).
    pub name: String,
    pub duration: Duration,
    pub tags: Vec<(String, String)>,
}

impl TraceRecord {
    pub fn new(
        trace_type: TraceType,
        trace_id: impl Into<Arc<str>>,
        name: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            trace_type,
            trace_id: trace_id.into(),
            name: name.into(),
            duration,
            tags: Vec::new(),
        }
    }

    #[inline]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }
}

type CallbackFn = Box<dyn FnOnce() -> Result<(), HandlerError> + Send + 'static>;

/// Keyed closure carried inside an event and invoked by the consuming listener.
///
/// The key identifies the callback's family (e.g. a report type) and is what
/// [`ReportListener`](crate::ReportListener) shards on, so callbacks of one family run
/// in publish order.
pub struct Callback {
    key: Arc<str>,
    f: CallbackFn,
}

impl Callback {
    pub fn new<F>(key: impl Into<Arc<str>>, f: F) -> Self
    where
        F: FnOnce() -> Result<(), HandlerError> + Send + 'static,
    {
        Self {
            key: key.into(),
            f: Box::new(f),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn shared_key(&self) -> Arc<str> {
        Arc::clone(&self.key)
    }

    /// Consumes the callback and runs it.
    pub fn call(self) -> Result<(), HandlerError> {
        (self.f)()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("key", &self.key).finish()
    }
}

/// What an event carries.
pub enum Payload {
    /// A report payload and the destination key it was reported under.
    Metric {
        key: Arc<str>,
        report: ReportPayload,
    },
    /// A finished trace span.
    Trace(TraceRecord),
    /// A keyed closure to run on the consumer side.
    Callback(Callback),
    /// Opaque producer-defined data.
    Custom(Box<dyn Any + Send>),
}

impl Payload {
    /// Short label of the payload kind, for logs.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Payload::Metric { .. } => "metric",
            Payload::Trace(_) => "trace",
            Payload::Callback(_) => "callback",
            Payload::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Metric { key, report } => f
                .debug_struct("Metric")
                .field("key", key)
                .field("report", report)
                .finish(),
            Payload::Trace(rec) => f.debug_tuple("Trace").field(rec).finish(),
            Payload::Callback(cb) => f.debug_tuple("Callback").field(cb).finish(),
            Payload::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Unit of work published on the bus.
///
/// - `seq`: monotonic global sequence number
/// - `at`: wall-clock creation time
/// - `kind`: discriminator matched against listener type filters
/// - `payload`: the data itself
#[derive(Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event-type discriminator.
    pub kind: EventType,
    /// Carried data.
    pub payload: Payload,
}

impl Event {
    /// Creates a new event with current timestamp and next sequence number.
    pub fn new(kind: EventType, payload: Payload) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            payload,
        }
    }

    /// Creates a `metric` event for a report payload.
    #[inline]
    pub fn metric(key: impl Into<Arc<str>>, report: ReportPayload) -> Self {
        Event::new(
            EventType::METRIC,
            Payload::Metric {
                key: key.into(),
                report,
            },
        )
    }

    /// Creates a `trace` event.
    #[inline]
    pub fn trace(record: TraceRecord) -> Self {
        Event::new(EventType::TRACE, Payload::Trace(record))
    }

    /// Creates a `report` event carrying a callback.
    #[inline]
    pub fn callback(callback: Callback) -> Self {
        Event::new(EventType::REPORT, Payload::Callback(callback))
    }

    /// Creates an event with an opaque payload.
    #[inline]
    pub fn custom<T: Any + Send>(kind: EventType, value: T) -> Self {
        Event::new(kind, Payload::Custom(Box::new(value)))
    }

    /// Returns the trace record, if this is a trace event.
    pub fn as_trace(&self) -> Option<&TraceRecord> {
        match &self.payload {
            Payload::Trace(rec) => Some(rec),
            _ => None,
        }
    }

    /// Returns the opaque payload downcast to `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::custom(EventType::new("t"), 1_u32);
        let b = Event::custom(EventType::new("t"), 2_u32);
        assert!(b.seq > a.seq);
        assert_eq!(b.downcast_ref::<u32>(), Some(&2));
        assert_eq!(b.downcast_ref::<String>(), None);
    }

    #[test]
    fn event_types_compare_by_name() {
        assert_eq!(EventType::new("report"), EventType::REPORT);
        assert_ne!(EventType::METRIC, EventType::TRACE);
        assert_eq!(EventType::from("trace").as_str(), "trace");
    }

    #[test]
    fn callback_runs_once_with_its_key() {
        let cb = Callback::new("mq-publish", || Err(HandlerError::failed("boom")));
        assert_eq!(cb.key(), "mq-publish");
        assert!(cb.call().is_err());
    }

    #[test]
    fn trace_keys_match_wire_names() {
        assert_eq!(TraceType::HttpServer.key(), "http-server");
        assert_eq!(TraceType::MqConsume.key(), "mq-consume");

        let ev = Event::trace(
            TraceRecord::new(TraceType::CustomMark, "t-1", "mark", Duration::from_millis(3))
                .with_tag("k", "v"),
        );
        let rec = ev.as_trace().expect("trace payload");
        assert_eq!(&*rec.trace_id, "t-1");
        assert_eq!(rec.tags.len(), 1);
    }
}
