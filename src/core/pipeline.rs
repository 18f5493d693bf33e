//! # Pipeline: one bus, one scheduler, one ordered teardown.
//!
//! [`Pipeline`] is the explicitly owned registry object the host creates at startup.
//! It holds the [`Bus`] and the [`Scheduler`] built from one [`Config`] and runs the
//! shutdown sequence in order:
//!
//! ```text
//! shutdown():
//!   1. Scheduler::stop(stop_timeout)   no new ticks, tasks released or abandoned
//!   2. Bus::drain(drain_timeout)       intake closed, queues flushed or discarded
//!   └─► ShutdownReport { abandoned, drain }
//! ```
//!
//! Stopping the scheduler first means the last ticks' payloads can still flow through
//! a [`BusSink`](crate::BusSink) before the bus closes.
//!
//! ## Example
//! ```rust
//! use pulsevisor::{Config, Pipeline, ReportListener, Settings};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::builder(Config::default())
//!         .with_settings(Settings::parse("shutdown.drainTimeoutMs=500"))
//!         .with_listener(ReportListener::subscription(2))
//!         .with_throughput_metrics()
//!         .build()?;
//!
//!     pipeline.start().await;
//!     let report = pipeline.shutdown().await;
//!     assert!(report.is_clean());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::core::shutdown::wait_for_shutdown_signal;
use crate::core::{Config, PipelineBuilder};
use crate::error::RuntimeError;
use crate::events::{Bus, DrainReport};
use crate::schedule::Scheduler;

/// Outcome of [`Pipeline::shutdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks that did not stop within `stop_timeout`.
    pub abandoned: Vec<String>,
    /// Result of draining the bus.
    pub drain: DrainReport,
}

impl ShutdownReport {
    /// `true` if every task stopped and every queued event was handled.
    pub fn is_clean(&self) -> bool {
        self.abandoned.is_empty() && self.drain.completed && self.drain.dropped == 0
    }
}

/// Running telemetry pipeline.
pub struct Pipeline {
    cfg: Config,
    bus: Bus,
    scheduler: Arc<Scheduler>,
}

impl Pipeline {
    /// Starts building a pipeline.
    pub fn builder(cfg: Config) -> PipelineBuilder {
        PipelineBuilder::new(cfg)
    }

    pub(crate) fn new(cfg: Config, bus: Bus, scheduler: Arc<Scheduler>) -> Self {
        Self {
            cfg,
            bus,
            scheduler,
        }
    }

    /// Producer handle; clone it into instrumentation call-sites.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Effective configuration (after settings were applied).
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Starts every scheduled task; returns how many started.
    pub async fn start(&self) -> usize {
        let started = self.scheduler.start().await;
        info!(tasks = started, listeners = self.bus.listener_names().len(), "pipeline started");
        started
    }

    /// Stops the scheduler, then drains the bus, each within its configured timeout.
    pub async fn shutdown(&self) -> ShutdownReport {
        let abandoned = match self.scheduler.stop(self.cfg.stop_timeout).await {
            Ok(()) => Vec::new(),
            Err(RuntimeError::GraceExceeded { stuck, .. }) => stuck,
        };
        let drain = self.bus.drain(self.cfg.drain_timeout).await;

        let report = ShutdownReport { abandoned, drain };
        if report.is_clean() {
            info!("pipeline stopped cleanly");
        } else {
            warn!(abandoned = ?report.abandoned, dropped = report.drain.dropped, "pipeline stopped with losses");
        }
        report
    }

    /// Waits for a termination signal, then runs [`shutdown`](Self::shutdown).
    ///
    /// ### Errors
    /// Only if signal handlers cannot be installed; the pipeline is shut down anyway.
    pub async fn run_until_signal(&self) -> std::io::Result<ShutdownReport> {
        let waited = wait_for_shutdown_signal().await;
        let report = self.shutdown().await;
        waited.map(|_| report)
    }
}
