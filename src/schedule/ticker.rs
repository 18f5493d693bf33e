//! # Per-task fixed-rate ticker.
//!
//! Drives one [`ScheduledTask`] until cancelled. Tick `n` is due at `start + n * interval`;
//! the first one fires immediately. `execute` is awaited inline, so a task never
//! overlaps itself: every tick that came due while `execute` was still running is
//! skipped, counted and logged, and the schedule resumes on the original grid.
//!
//! ```text
//! interval = 1s, execute takes 2.5s
//!
//! t:  0      1      2      3      4      5      6
//!     [run........]        [run........]        [run...
//!            skip   skip          skip   skip
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{TickError, panic_message};
use crate::schedule::task::{TaskRef, TickContext};

/// Counters of one scheduled task.
#[derive(Debug, Default)]
pub(crate) struct TaskCounters {
    ticks: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    running: AtomicBool,
}

/// Snapshot of a task's tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// `execute` invocations started.
    pub ticks: u64,
    /// Ticks that returned an error or panicked.
    pub failed: u64,
    /// Ticks dropped because the previous one was still running.
    pub skipped: u64,
}

impl TaskCounters {
    pub(crate) fn snapshot(&self) -> TaskStats {
        TaskStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Offset of tick `index` from the schedule start.
fn offset(interval: Duration, index: u64) -> Duration {
    let nanos = interval.as_nanos().saturating_mul(u128::from(index));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Index of the next tick after `current` that is not already in the past.
fn next_index(interval: Duration, elapsed: Duration, current: u64) -> u64 {
    let period = interval.as_nanos().max(1);
    let first_not_past = elapsed.as_nanos().div_ceil(period);
    u64::try_from(first_not_past)
        .unwrap_or(u64::MAX)
        .max(current + 1)
}

/// Runs `task` every `interval` until `token` is cancelled.
pub(crate) async fn run_ticker(
    task: TaskRef,
    interval: Duration,
    token: CancellationToken,
    counters: Arc<TaskCounters>,
) {
    let name = task.name().to_string();
    let start = Instant::now();
    let mut index: u64 = 0;
    counters.running.store(true, Ordering::Release);

    loop {
        let due = start + offset(interval, index);
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = time::sleep_until(due) => {}
        }

        let tick = counters.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let ctx = TickContext {
            interval,
            tick,
            token: token.child_token(),
        };

        let outcome = std::panic::AssertUnwindSafe(task.execute(&ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(TickError::Panicked {
                    info: panic_message(panic.as_ref()),
                })
            });
        if let Err(err) = outcome {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(task = %name, tick, label = err.as_label(), error = %err, "tick failed");
        }

        let next = next_index(interval, start.elapsed(), index);
        let skipped = next - index - 1;
        if skipped > 0 {
            counters.skipped.fetch_add(skipped, Ordering::Relaxed);
            warn!(task = %name, tick, skipped, ?interval, "tick overran its interval; skipping due ticks");
        }
        index = next;
    }

    counters.running.store(false, Ordering::Release);
    debug!(task = %name, "ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_index_skips_only_past_deadlines() {
        let s = Duration::from_secs(1);
        assert_eq!(next_index(s, Duration::from_millis(300), 0), 1);
        assert_eq!(next_index(s, Duration::from_millis(1000), 0), 1);
        assert_eq!(next_index(s, Duration::from_millis(2500), 0), 3);
        assert_eq!(next_index(s, Duration::from_millis(3100), 3), 4);
    }

    #[test]
    fn offsets_are_on_the_grid() {
        assert_eq!(offset(Duration::from_secs(5), 3), Duration::from_secs(15));
        assert_eq!(offset(Duration::from_secs(5), 0), Duration::ZERO);
    }
}
