//! # Event listeners (consumers) for the bus.
//!
//! ## Architecture
//! ```text
//! Producers ── publish(Event) ──► Bus ──► first matching Subscription by weight
//!                                              │
//!                                              ▼
//!                                         WorkerPool (P workers, bounded lanes)
//!                                              │
//!                                              ▼
//!                                   Listener::accept(Event)  ──► counters
//! ```
//!
//! ## Contents
//! - [`Listener`], [`TypeFilter`] the consumer trait and its type filter
//! - [`Subscription`] registration (parallelism, shard key, weight, queue capacity)
//! - [`ListenerCounters`], [`ListenerStats`] self-counters with read-and-clear period
//! - [`ReportListener`] runs callback payloads, sharded by callback key
//! - `LogListener` (feature `logging`) writes every event through `tracing`

mod counters;
mod embedded;
mod listener;
pub(crate) mod pool;
mod subscription;

pub use counters::{ListenerCounters, ListenerStats};
#[cfg(feature = "logging")]
pub use embedded::LogListener;
pub use embedded::ReportListener;
pub use listener::{Listener, TypeFilter};
pub use subscription::{BASELINE_WEIGHT, Subscription};
