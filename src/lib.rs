//! # pulsevisor
//!
//! **Pulsevisor** is the telemetry backbone of an in-process monitoring agent.
//!
//! It samples process health on a configurable cadence and carries typed events
//! (metrics, traces, report callbacks) from many producers to a few consumers without
//! blocking producers, while counting everything it consumes, drops or cannot route.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌────────────────────────────────────────┐       instrumentation call-sites
//!  │ Scheduler                              │          │        │        │
//!  │  ┌──────────────┐  ┌────────────────┐  │          │ emit() / publish()
//!  │  │ processMetric│  │ eventBusMetric │  │          ▼        ▼        ▼
//!  │  │ (collectors) │  │ (bus counters) │  │   ┌──────────────────────────────────┐
//!  │  └──────┬───────┘  └───────┬────────┘  │   │ Bus                              │
//!  └─────────┼──────────────────┼───────────┘   │  routes sorted by weight (desc)  │
//!            ▼                  ▼               │  first listener whose type filter│
//!     ┌─────────────────────────────┐           │  and test() match takes the event│
//!     │ ReportSink                  │           └───┬──────────────┬───────────┬───┘
//!     │  BusSink ───────────────────┼──────────►    ▼              ▼           ▼
//!     │  LogSink / external         │        ┌────────────┐ ┌────────────┐ unrouted++
//!     └─────────────────────────────┘        │ WorkerPool │ │ WorkerPool │
//!                                            │ P lanes    │ │ shared lane│
//!                                            │ (sharded)  │ │ P workers  │
//!                                            └─────┬──────┘ └─────┬──────┘
//!                                                  ▼              ▼
//!                                            Listener::accept  Listener::accept
//!                                            (counters: total, period, dropped, failed)
//! ```
//!
//! ### Tick
//! ```text
//! every interval (fixed rate, never overlapping):
//!   collect() per collector ── error/panic ─► logged, family omitted
//!   merge fields + interval ─► ReportPayload ─► sink.report(key) ── error ─► logged
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                           |
//! |-------------------|-----------------------------------------------------------------|----------------------------------------------|
//! | **Bus**           | Weighted first-match dispatch, bounded per-listener queues.      | [`Bus`], [`Event`], [`Payload`]              |
//! | **Listeners**     | Consumers with parallelism, shard-by-key ordering and counters.  | [`Listener`], [`Subscription`]               |
//! | **Scheduling**    | Fixed-rate periodic tasks with overlap suppression.              | [`Scheduler`], [`ScheduledTask`]             |
//! | **Collection**    | Per-family collectors merged into one payload per tick.          | [`Collector`], [`CollectorSchedule`]         |
//! | **Reporting**     | Sinks receiving assembled payloads.                              | [`ReportSink`], [`BusSink`], [`LogSink`]     |
//! | **Errors**        | Typed errors with stable labels.                                 | [`RegistrationError`], [`RuntimeError`], ... |
//! | **Configuration** | Defaults plus flat dotted-key overrides.                         | [`Config`], [`Settings`]                     |
//!
//! ## Optional features
//! - `system-collectors` (default): sysinfo-backed process, memory and thread collectors.
//! - `logging`: exports a catch-all [`LogListener`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use pulsevisor::{Callback, Config, Event, Pipeline, ReportListener, Settings};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::parse(
//!         "eventBus.queueCapacity = 4096\n\
//!          metricOutput.interval.eventBus = 60\n",
//!     );
//!
//!     let pipeline = Pipeline::builder(Config::default())
//!         .with_settings(settings)
//!         .with_listener(ReportListener::subscription(4))
//!         .with_throughput_metrics()
//!         .build()?;
//!     pipeline.start().await;
//!
//!     // An instrumentation call-site hands work to the report listener.
//!     pipeline
//!         .bus()
//!         .publish(Event::callback(Callback::new("http-client", || Ok(()))))?;
//!
//!     let report = pipeline.shutdown().await;
//!     assert!(report.abandoned.is_empty());
//!     Ok(())
//! }
//! ```

mod collectors;
mod core;
mod error;
mod events;
mod listeners;
mod report;
mod schedule;

// ---- Public re-exports ----

pub use collectors::{Collector, CollectorFactory, CollectorSchedule, MetricSnapshot, ThroughputSchedule};
#[cfg(feature = "system-collectors")]
pub use collectors::{MemoryCollector, ProcessCollector, ThreadCollector};
pub use core::{
    BusConfig, Config, Pipeline, PipelineBuilder, Settings, ShutdownReport,
    wait_for_shutdown_signal,
};
pub use error::{
    CollectorError, ConfigParseError, HandlerError, PublishError, RegistrationError,
    ReportError, RuntimeError, TickError,
};
pub use events::{Bus, Callback, DrainReport, Event, EventType, Payload, TraceRecord, TraceType};
#[cfg(feature = "logging")]
pub use listeners::LogListener;
pub use listeners::{
    BASELINE_WEIGHT, Listener, ListenerCounters, ListenerStats, ReportListener, Subscription,
    TypeFilter,
};
pub use report::{BusSink, LogSink, MetricValue, ReportPayload, ReportSink};
pub use schedule::{
    INTERVAL_KEY_PREFIX, ScheduleFn, ScheduledTask, Scheduler, TaskRef, TaskStats, TickContext,
};
