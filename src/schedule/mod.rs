//! Periodic collection scheduling.
//!
//! ## Contents
//! - [`ScheduledTask`], [`TickContext`], [`TaskRef`] the task contract
//! - [`ScheduleFn`] closure-backed task
//! - [`Scheduler`] register / configure / start / stop, one ticker per task
//! - [`TaskStats`] ticks run, failed and skipped per task

mod scheduler;
mod task;
mod task_fn;
mod ticker;

pub use scheduler::{INTERVAL_KEY_PREFIX, Scheduler};
pub use task::{ScheduledTask, TaskRef, TickContext};
pub use task_fn::ScheduleFn;
pub use ticker::TaskStats;
