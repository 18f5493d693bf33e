//! Report payloads and the sinks that ship them.
//!
//! ## Contents
//! - [`ReportPayload`], [`MetricValue`] flat key → scalar mapping built fresh per tick
//! - [`ReportSink`] the `report(key, payload)` contract used by scheduled tasks
//! - [`BusSink`] publishes payloads onto the [`Bus`](crate::Bus) as `metric` events
//! - [`LogSink`] writes payloads through `tracing`

mod payload;
mod sink;

pub use payload::{MetricValue, ReportPayload};
pub use sink::{BusSink, LogSink, ReportSink};
