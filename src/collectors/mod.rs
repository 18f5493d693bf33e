//! Metric collection tasks.
//!
//! ## Contents
//! - [`Collector`], [`MetricSnapshot`] the per-family sampling contract
//! - [`CollectorSchedule`] scheduled task running the collect / merge / report tick
//! - [`ThroughputSchedule`] scheduled task reporting bus self-counters
//! - `system` (feature `system-collectors`) sysinfo-backed process collectors and
//!   `CollectorSchedule::process_metrics`

mod collector;
mod schedule;
#[cfg(feature = "system-collectors")]
mod system;
mod throughput;

pub use collector::{Collector, CollectorFactory, MetricSnapshot};
pub use schedule::CollectorSchedule;
#[cfg(feature = "system-collectors")]
pub use system::{MemoryCollector, ProcessCollector, ThreadCollector};
pub use throughput::ThroughputSchedule;
