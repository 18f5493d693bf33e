//! # Scheduled task abstraction.
//!
//! This module defines the [`ScheduledTask`] trait (a named periodic job with setup,
//! per-tick body and best-effort stop) and the [`TickContext`] handed to every tick.
//! The common handle type is [`TaskRef`], an `Arc<dyn ScheduledTask>`.
//!
//! ## Lifecycle
//! ```text
//! register ─► configure* ─► start: before_run() ─► execute(tick 1) ─► execute(tick 2) ─► ...
//!                                     │ Err                                   │
//!                                     └─► task skipped, logged                stop: shutdown(timeout)
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TickError;

/// Shared handle to a scheduled task.
pub type TaskRef = Arc<dyn ScheduledTask>;

/// Per-tick information.
#[derive(Debug, Clone)]
pub struct TickContext {
    /// Effective interval of the task.
    pub interval: Duration,
    /// 1-based tick number.
    pub tick: u64,
    /// Cancelled when the scheduler stops; long ticks should check it.
    pub token: CancellationToken,
}

impl TickContext {
    /// Interval in whole seconds, as reported in payloads.
    #[inline]
    pub fn interval_secs(&self) -> u64 {
        self.interval.as_secs()
    }
}

/// # Periodic job driven by the [`Scheduler`](crate::Scheduler).
///
/// At most one `execute` of a task is in flight at any time; ticks that come due while
/// it runs are skipped.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use pulsevisor::{ScheduledTask, TickContext, TickError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl ScheduledTask for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn execute(&self, ctx: &TickContext) -> Result<(), TickError> {
///         if ctx.token.is_cancelled() {
///             return Ok(());
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ScheduledTask: Send + Sync + 'static {
    /// Stable task name, unique within a scheduler.
    fn name(&self) -> &str;

    /// Dotted configuration key holding this task's interval in seconds, if any
    /// (e.g. `metricOutput.interval.jvm`).
    fn config_key(&self) -> Option<&str> {
        None
    }

    /// One-time setup before the first tick. An error keeps the task from running.
    async fn before_run(&self) -> Result<(), TickError> {
        Ok(())
    }

    /// Per-tick body.
    async fn execute(&self, ctx: &TickContext) -> Result<(), TickError>;

    /// Best-effort stop; returns `true` if resources were released in time.
    async fn shutdown(&self, timeout: Duration) -> bool {
        let _ = timeout;
        true
    }
}
