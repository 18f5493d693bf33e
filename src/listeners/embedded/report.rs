//! # ReportListener: runs callback payloads off the producer thread.
//!
//! Instrumentation call-sites often need to ship something (a report, a span) without
//! paying for it inline. They wrap the work into a [`Callback`](crate::Callback), publish
//! it as a `report` event, and this listener invokes it on a worker.
//!
//! ## Rules
//! - Accepts only [`EventType::REPORT`].
//! - Sharded by callback key: callbacks of one family run in publish order, families run
//!   in parallel across workers.
//! - Registered above baseline weight so it wins over catch-all listeners.
//! - A callback error is returned to the worker, which logs and counts it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::{Event, EventType, Payload};
use crate::listeners::{BASELINE_WEIGHT, Listener, Subscription, TypeFilter};

/// Listener that invokes [`Payload::Callback`] closures.
#[derive(Debug, Default)]
pub struct ReportListener;

impl ReportListener {
    /// Weight of the default registration.
    pub const WEIGHT: i32 = BASELINE_WEIGHT + 50;

    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Default registration: `parallelism` workers, sharded by callback key.
    pub fn subscription(parallelism: usize) -> Subscription {
        Subscription::new(Arc::new(Self))
            .parallelism(parallelism)
            .weight(Self::WEIGHT)
            .shard_by(|ev: &Event| match &ev.payload {
                Payload::Callback(cb) => Some(cb.shared_key()),
                _ => None,
            })
    }
}

#[async_trait]
impl Listener for ReportListener {
    fn name(&self) -> &str {
        "report"
    }

    fn event_types(&self) -> TypeFilter {
        TypeFilter::only([EventType::REPORT])
    }

    fn test(&self, event: &Event) -> bool {
        matches!(event.payload, Payload::Callback(_))
    }

    async fn accept(&self, event: Event) -> Result<(), HandlerError> {
        match event.payload {
            Payload::Callback(cb) => cb.call(),
            other => Err(HandlerError::UnexpectedPayload {
                kind: other.kind_label(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Callback;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_the_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let ev = Event::callback(Callback::new("http-client", move || {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let listener = ReportListener::new();
        assert!(listener.test(&ev));
        listener.accept(ev).await.expect("callback ok");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_other_payloads() {
        let listener = ReportListener::new();
        let ev = Event::custom(EventType::REPORT, 1_u8);
        assert!(!listener.test(&ev));

        let err = listener.accept(ev).await.unwrap_err();
        assert_eq!(err.as_label(), "handler_unexpected_payload");
    }

    #[test]
    fn default_subscription_is_sharded_above_baseline() {
        let sub = ReportListener::subscription(4);
        assert!(sub.is_sharded());
        assert_eq!(sub.get_parallelism(), 4);
        assert_eq!(sub.get_weight(), 150);
    }
}
