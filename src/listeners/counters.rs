//! # Per-listener self-counters.
//!
//! Lock-free counters updated on the hot path by workers and producers, read by a
//! periodic reporter on the cold path.
//!
//! | Counter    | Updated by                 | Read                                  |
//! |------------|----------------------------|---------------------------------------|
//! | `total`    | worker, per consumed event | `load` (monotonic)                    |
//! | `period`   | worker, per consumed event | `swap(0)` read-and-clear              |
//! | `dropped`  | producer (queue full) / drain deadline | `load`                    |
//! | `failed`   | worker (handler error/panic)            | `load`                    |
//! | `pending`  | producer +1 on enqueue, worker -1 on pick-up | drain accounting |
//!
//! `pending` carries an abandoned bit in its top bit. Once drain sets it, enqueue and
//! pick-up both fail, so every event is counted exactly once: consumed by a worker
//! that claimed it first, or dropped.
//!
//! Read-and-clear is exact under concurrent increments: each increment lands either
//! before a swap (and is returned by it) or after (and is returned by the next one).

use std::sync::atomic::{AtomicU64, Ordering};

const ABANDONED: u64 = 1 << 63;

/// Self-counters of one listener registration.
#[derive(Debug, Default)]
pub struct ListenerCounters {
    total: AtomicU64,
    period: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    pending: AtomicU64,
}

/// Point-in-time copy of a listener's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerStats {
    pub name: String,
    pub total: u64,
    pub period: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl ListenerCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifetime number of consumed events.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Returns the events consumed since the previous call and resets the period to zero.
    pub fn take_period(&self) -> u64 {
        self.period.swap(0, Ordering::AcqRel)
    }

    /// Events consumed since the last [`take_period`](Self::take_period), without clearing.
    pub fn peek_period(&self) -> u64 {
        self.period.load(Ordering::Relaxed)
    }

    /// Events dropped for this listener (queue full, closed, or abandoned at drain).
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events whose handler returned an error or panicked.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Events enqueued but not yet picked up by a worker.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Acquire) & !ABANDONED
    }

    /// `true` once the pending events were written off by a drain.
    pub fn is_abandoned(&self) -> bool {
        self.pending.load(Ordering::Acquire) & ABANDONED != 0
    }

    #[inline]
    pub(crate) fn record_consumed(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.period.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn record_dropped(&self, n: u64) {
        self.dropped.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one enqueued event; `false` once abandoned.
    #[inline]
    pub(crate) fn begin_pending(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                (v & ABANDONED == 0).then(|| v + 1)
            })
            .is_ok()
    }

    /// Claims one pending event; `false` once abandoned (the event was already
    /// counted as dropped and must not be delivered).
    #[inline]
    pub(crate) fn end_pending(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                (v & ABANDONED == 0).then(|| v.saturating_sub(1))
            })
            .is_ok()
    }

    /// Converts every pending event into a dropped one and closes intake; returns how many.
    pub(crate) fn abandon_pending(&self) -> u64 {
        let n = self.pending.swap(ABANDONED, Ordering::AcqRel) & !ABANDONED;
        self.record_dropped(n);
        n
    }

    /// Copies the counters; when `clear_period` is set, the period is read-and-cleared.
    pub(crate) fn snapshot(&self, name: &str, clear_period: bool) -> ListenerStats {
        ListenerStats {
            name: name.to_string(),
            total: self.total(),
            period: if clear_period {
                self.take_period()
            } else {
                self.peek_period()
            },
            dropped: self.dropped(),
            failed: self.failed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn period_resets_on_read() {
        let c = ListenerCounters::new();
        c.record_consumed();
        c.record_consumed();
        assert_eq!(c.take_period(), 2);
        assert_eq!(c.take_period(), 0);
        c.record_consumed();
        assert_eq!(c.take_period(), 1);
        assert_eq!(c.total(), 3);
    }

    #[test]
    fn read_and_clear_is_exact_under_concurrent_writers() {
        let c = Arc::new(ListenerCounters::new());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&c);
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        c.record_consumed();
                    }
                })
            })
            .collect();

        let mut seen = 0;
        while writers.iter().any(|w| !w.is_finished()) {
            seen += c.take_period();
        }
        for w in writers {
            w.join().expect("writer thread");
        }
        seen += c.take_period();

        assert_eq!(seen, 40_000);
        assert_eq!(c.total(), 40_000);
    }

    #[test]
    fn pending_never_underflows_and_abandons_into_dropped() {
        let c = ListenerCounters::new();
        c.end_pending();
        assert_eq!(c.pending(), 0);

        c.begin_pending();
        c.begin_pending();
        c.begin_pending();
        c.end_pending();
        assert_eq!(c.abandon_pending(), 2);
        assert_eq!(c.dropped(), 2);
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn nothing_is_claimed_or_enqueued_after_abandonment() {
        let c = ListenerCounters::new();
        assert!(c.begin_pending());
        assert!(c.begin_pending());
        assert_eq!(c.abandon_pending(), 2);
        assert!(c.is_abandoned());

        // A worker that picked one of them up must not deliver it.
        assert!(!c.end_pending());
        assert!(!c.begin_pending());
        assert_eq!(c.pending(), 0);
        assert_eq!(c.dropped(), 2);
        assert_eq!(c.abandon_pending(), 0);
    }
}
