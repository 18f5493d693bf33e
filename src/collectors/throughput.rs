//! # ThroughputSchedule: bus self-metrics.
//!
//! Periodically samples every listener's counters (reading-and-clearing the period
//! counter, so successive reports never double count) plus the bus-level drop counters,
//! and reports them as one payload:
//!
//! ```text
//! report.total=1042 report.period=87 report.dropped=0 report.failed=1
//! log.total=3 log.period=0 log.dropped=0 log.failed=0
//! bus.unrouted=2 bus.rejected=0 interval=60
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::TickError;
use crate::events::Bus;
use crate::report::{ReportPayload, ReportSink};
use crate::schedule::{ScheduledTask, TickContext};

/// Scheduled task reporting bus throughput.
pub struct ThroughputSchedule {
    bus: Bus,
    sink: Arc<dyn ReportSink>,
}

impl ThroughputSchedule {
    /// Task name and report key.
    pub const NAME: &'static str = "eventBusMetric";
    /// Interval key.
    pub const INTERVAL_KEY: &'static str = "metricOutput.interval.eventBus";
    /// Destination path.
    pub const PATH: &'static str = "status/eventBus";

    pub fn new(bus: Bus, sink: Arc<dyn ReportSink>) -> Self {
        Self { bus, sink }
    }

    /// Builds this tick's payload, clearing every period counter.
    fn sample(&self) -> ReportPayload {
        let mut payload = ReportPayload::new(Self::PATH);
        for stats in self.bus.take_stats() {
            payload.insert(format!("{}.total", stats.name), stats.total);
            payload.insert(format!("{}.period", stats.name), stats.period);
            payload.insert(format!("{}.dropped", stats.name), stats.dropped);
            payload.insert(format!("{}.failed", stats.name), stats.failed);
        }
        payload.insert("bus.unrouted", self.bus.unrouted());
        payload.insert("bus.rejected", self.bus.rejected());
        payload
    }
}

#[async_trait]
impl ScheduledTask for ThroughputSchedule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config_key(&self) -> Option<&str> {
        Some(Self::INTERVAL_KEY)
    }

    async fn execute(&self, ctx: &TickContext) -> Result<(), TickError> {
        let mut payload = self.sample();
        payload.insert("interval", ctx.interval_secs());
        if let Err(err) = self.sink.report(Self::NAME, payload).await {
            warn!(task = Self::NAME, label = err.as_label(), error = %err, "report failed");
        }
        Ok(())
    }
}
