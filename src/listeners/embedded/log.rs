//! # LogListener: catch-all event printer.
//!
//! Writes every event it consumes through `tracing::info!`. Registered at the lowest
//! weight so it only sees events no other listener took. Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO pulsevisor: [metric] seq=4 key="processMetric" fields=7
//! INFO pulsevisor: [trace] seq=5 type="http-server" trace_id="t-1" name="/orders" duration=12ms
//! WARN pulsevisor: [callback] dropped without running; ... seq=6 key="mq-publish"
//! INFO pulsevisor: [custom] seq=7 type="audit"
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::HandlerError;
use crate::events::{Event, Payload};
use crate::listeners::{Listener, Subscription};

/// Event writer listener.
#[derive(Default)]
pub struct LogListener;

impl LogListener {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Registration at the lowest possible weight.
    pub fn subscription() -> Subscription {
        Subscription::new(Arc::new(Self)).weight(i32::MIN)
    }
}

#[async_trait]
impl Listener for LogListener {
    fn name(&self) -> &str {
        "log"
    }

    async fn accept(&self, e: Event) -> Result<(), HandlerError> {
        match &e.payload {
            Payload::Metric { key, report } => {
                info!(seq = e.seq, key = %key, path = report.path(), fields = report.len(), "[metric]");
            }
            Payload::Trace(rec) => {
                info!(
                    seq = e.seq,
                    r#type = rec.trace_type.key(),
                    trace_id = %rec.trace_id,
                    name = %rec.name,
                    duration = ?rec.duration,
                    "[trace]"
                );
            }
            Payload::Callback(cb) => {
                warn!(seq = e.seq, key = cb.key(), r#type = %e.kind, "[callback] dropped without running; publish callbacks as `report` events");
            }
            Payload::Custom(_) => {
                info!(seq = e.seq, r#type = %e.kind, "[custom]");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Callback, EventType};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn stray_callbacks_are_reported_not_run() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let cb = Callback::new("mq-publish", move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        let ev = Event::new(EventType::new("audit"), Payload::Callback(cb));

        LogListener::new().accept(ev).await.unwrap();

        assert!(!ran.load(Ordering::SeqCst));
        assert!(logs_contain("dropped without running"));
    }
}
