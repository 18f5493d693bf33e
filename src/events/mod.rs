//! Events and the dispatch bus.
//!
//! This module groups the event **data model** and the **bus** that routes each event
//! to exactly one listener.
//!
//! ## Contents
//! - [`Event`], [`EventType`], [`Payload`] the unit of work and its discriminator
//! - [`Callback`], [`TraceRecord`], [`TraceType`] typed payloads
//! - [`Bus`] weighted first-match dispatch onto per-listener worker pools
//!
//! ## Quick reference
//! - **Publishers**: instrumentation call-sites (`Bus::emit`), scheduled tasks through
//!   [`BusSink`](crate::BusSink).
//! - **Consumers**: [`Listener`](crate::Listener)s registered with a
//!   [`Subscription`](crate::Subscription).
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::{Bus, DrainReport};
pub use event::{Callback, Event, EventType, Payload, TraceRecord, TraceType};
