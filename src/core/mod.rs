//! Runtime core: configuration, wiring and lifecycle.
//!
//! ## Wiring
//! ```text
//!  Settings ──► Config::apply ──► Config
//!     │                              │
//!     │                  ┌───────────┴────────────┐
//!     │                  ▼                        ▼
//!     └──► configure_all ─► Scheduler          Bus ◄── emit()/publish() ── call-sites
//!                             │ ticks               │
//!                             ▼                     ▼
//!                     CollectorSchedule ──► ReportSink (BusSink ──► Bus) ──► Listeners
//! ```
//!
//! The only entry points are [`Pipeline`] (built with [`PipelineBuilder`]) and the
//! configuration types; the bus and scheduler can also be used on their own.
//!
//! Internal modules:
//! - [`config`]: [`Config`] and [`BusConfig`] with global key overrides;
//! - [`settings`]: flat dotted-key map;
//! - [`builder`] / [`pipeline`]: construction and ordered shutdown;
//! - [`shutdown`]: cross-platform termination signal helper.

mod builder;
mod config;
mod pipeline;
mod settings;
mod shutdown;

pub use builder::PipelineBuilder;
pub use config::{BusConfig, Config};
pub use pipeline::{Pipeline, ShutdownReport};
pub use settings::Settings;
pub use shutdown::wait_for_shutdown_signal;
