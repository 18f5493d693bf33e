//! # Report sinks.
//!
//! A [`ReportSink`] is where a scheduled task hands its per-tick payload. The transport
//! behind it (serialization, remote backend) lives outside this crate; two sinks ship
//! in-tree:
//!
//! - [`BusSink`] republishes the payload onto a [`Bus`] as a `metric` event, making the
//!   scheduler one more producer.
//! - [`LogSink`] writes the payload through `tracing`.
//!
//! Sink failures are logged by the caller and never abort a tick.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::ReportError;
use crate::events::{Bus, Event};
use crate::report::ReportPayload;

/// Destination for assembled payloads.
#[async_trait]
pub trait ReportSink: Send + Sync + 'static {
    /// Takes ownership of `payload` and ships it under `key`.
    async fn report(&self, key: &str, payload: ReportPayload) -> Result<(), ReportError>;
}

#[async_trait]
impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    async fn report(&self, key: &str, payload: ReportPayload) -> Result<(), ReportError> {
        (**self).report(key, payload).await
    }
}

/// Publishes payloads onto the bus as `metric` events.
#[derive(Clone, Debug)]
pub struct BusSink {
    bus: Bus,
}

impl BusSink {
    pub fn new(bus: Bus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl ReportSink for BusSink {
    async fn report(&self, key: &str, payload: ReportPayload) -> Result<(), ReportError> {
        if !self.bus.is_accepting() {
            return Err(ReportError::Closed);
        }
        self.bus
            .publish(Event::metric(key, payload))
            .map_err(|e| ReportError::Rejected {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Writes payloads through `tracing::info!`, fields in key order.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn report(&self, key: &str, payload: ReportPayload) -> Result<(), ReportError> {
        let fields = payload
            .sorted_fields()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!(key, path = payload.path(), group = ?payload.group(), "{fields}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BusConfig;
    use std::time::Duration;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn bus_sink_fails_when_bus_is_closed() {
        let bus = Bus::default();
        let sink = BusSink::new(bus.clone());
        assert!(sink.report("k", ReportPayload::new("p")).await.is_ok());
        assert_eq!(bus.unrouted(), 1);

        bus.drain(Duration::ZERO).await;
        let err = sink.report("k", ReportPayload::new("p")).await.unwrap_err();
        assert_eq!(err.as_label(), "report_closed");
    }

    #[tokio::test]
    async fn bus_sink_surfaces_missing_listener_as_rejection() {
        let bus = Bus::new(BusConfig {
            fail_on_missing_listener: true,
            ..BusConfig::default()
        });
        let err = BusSink::new(bus)
            .report("processMetric", ReportPayload::new("status/resources"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Rejected { ref key, .. } if key == "processMetric"));
    }

    #[tokio::test]
    #[traced_test]
    async fn log_sink_writes_sorted_fields() {
        let mut payload = ReportPayload::new("status/resources");
        payload.insert("b", 2_u64);
        payload.insert("a", 1_u64);
        LogSink.report("processMetric", payload).await.unwrap();
        assert!(logs_contain("a=1 b=2"));
    }
}
