//! # Event listener trait.
//!
//! Provides [`Listener`], the extension point for plugging consumers into the [`Bus`](crate::Bus).
//!
//! A listener declares:
//! - the event types it accepts ([`Listener::event_types`]),
//! - a cheap pre-filter ([`Listener::test`]) evaluated on the producer's thread,
//! - the side-effecting handler ([`Listener::accept`]) run on a worker.
//!
//! Parallelism, sharding and weight are properties of the registration, see
//! [`Subscription`](crate::Subscription).
//!
//! ## Selection
//! ```text
//! publish(ev) ─► listeners by weight desc ─► type filter? ─► test(ev)? ─► enqueue (first match wins)
//!                                                  │ no           │ false
//!                                                  └──────────────┴──► next listener
//! ```
//!
//! ## Rules
//! - `test` must be cheap and must not block: it runs inside `publish`.
//! - `accept` runs on a dedicated worker; errors and panics are caught, logged with the
//!   listener name and counted; the worker moves on to the next event.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use pulsevisor::{Event, EventType, HandlerError, Listener, TypeFilter};
//!
//! struct SlowCalls;
//!
//! #[async_trait]
//! impl Listener for SlowCalls {
//!     fn name(&self) -> &str { "slow-calls" }
//!
//!     fn event_types(&self) -> TypeFilter { TypeFilter::only([EventType::TRACE]) }
//!
//!     fn test(&self, ev: &Event) -> bool {
//!         ev.as_trace().is_some_and(|t| t.duration.as_millis() > 500)
//!     }
//!
//!     async fn accept(&self, _ev: Event) -> Result<(), HandlerError> {
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::{Event, EventType};

/// Set of event types a listener accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeFilter {
    /// Catch-all.
    #[default]
    Any,
    /// Only the listed types.
    Only(Vec<EventType>),
}

impl TypeFilter {
    /// Builds a filter for the given types.
    pub fn only(types: impl IntoIterator<Item = EventType>) -> Self {
        TypeFilter::Only(types.into_iter().collect())
    }

    #[inline]
    pub fn matches(&self, kind: &EventType) -> bool {
        match self {
            TypeFilter::Any => true,
            TypeFilter::Only(types) => types.iter().any(|t| t == kind),
        }
    }
}

/// Consumer registered on the bus.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Returns the listener name used in logs, counters and duplicate detection.
    ///
    /// Prefer short, descriptive names (e.g. "report", "trace-export").
    fn name(&self) -> &str;

    /// Event types this listener accepts. Default: all of them.
    ///
    /// Read once at subscribe time.
    fn event_types(&self) -> TypeFilter {
        TypeFilter::Any
    }

    /// Pre-filter evaluated during `publish`.
    ///
    /// Returning `false` lets the bus fall through to the next listener by weight.
    fn test(&self, event: &Event) -> bool {
        let _ = event;
        true
    }

    /// Consumes one event.
    ///
    /// Called from a worker task, never in the publisher context.
    async fn accept(&self, event: Event) -> Result<(), HandlerError>;
}
