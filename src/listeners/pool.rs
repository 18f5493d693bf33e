//! # Per-listener worker pool.
//!
//! [`WorkerPool`] owns the bounded queues ("lanes") and worker tasks of one
//! subscription, and hands events from the publisher to `Listener::accept` without
//! blocking it.
//!
//! ## Architecture
//! ```text
//! dispatch(ev)
//!     │  sharded: lane = hash(key) mod P       unsharded: lane 0
//!     ├──► [lane 0] ──► worker 0 ──► listener.accept()
//!     ├──► [lane 1] ──► worker 1 ──► listener.accept()     (sharded: one worker per lane)
//!     └──► [lane P-1] ─► worker P-1
//!
//!     [lane 0] ──┬──► worker 0                              (unsharded, P > 1: shared lane)
//!                ├──► worker 1
//!                └──► worker P-1
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `dispatch()` uses `try_send`; a full lane rejects the newest event,
//!   which is counted as dropped.
//! - **Isolation**: errors and panics inside `accept` are caught (`catch_unwind`),
//!   logged with the listener name, counted, and the worker continues.
//! - **Drain**: once the drain token fires, workers finish what is queued and exit when
//!   their lane is empty.
//! - **Pending**: an event counts as pending from enqueue until a worker claims it.
//!   Drain abandons the pool: whatever is still pending is counted as dropped, and a
//!   worker that picks up an abandoned event discards it and exits instead of
//!   delivering it, even if the abort has not reached it yet.

use std::sync::{Arc, Mutex as StdMutex};

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::panic_message;
use crate::events::Event;
use crate::listeners::subscription::{ShardFn, Subscription};
use crate::listeners::{Listener, ListenerCounters};

/// Outcome of handing one event to a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Enqueued,
    DroppedFull,
    DroppedClosed,
}

type Lane = Arc<Mutex<mpsc::Receiver<Event>>>;

/// Bounded lanes and workers of one subscription.
pub(crate) struct WorkerPool {
    name: Arc<str>,
    senders: Vec<mpsc::Sender<Event>>,
    shard: Option<ShardFn>,
    counters: Arc<ListenerCounters>,
    workers: StdMutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates the lanes and spawns the workers.
    ///
    /// Must be called inside a Tokio runtime.
    pub(crate) fn spawn(
        sub: &Subscription,
        capacity: usize,
        counters: Arc<ListenerCounters>,
        drain: CancellationToken,
    ) -> Self {
        let name: Arc<str> = Arc::from(sub.listener.name());
        let workers_n = sub.parallelism.max(1);
        let capacity = capacity.max(1);
        let lanes_n = if sub.shard.is_some() { workers_n } else { 1 };

        let mut senders = Vec::with_capacity(lanes_n);
        let mut lanes: Vec<Lane> = Vec::with_capacity(lanes_n);
        for _ in 0..lanes_n {
            let (tx, rx) = mpsc::channel::<Event>(capacity);
            senders.push(tx);
            lanes.push(Arc::new(Mutex::new(rx)));
        }

        let mut workers = Vec::with_capacity(workers_n);
        for i in 0..workers_n {
            let lane = Arc::clone(&lanes[i % lanes_n]);
            let listener = Arc::clone(&sub.listener);
            let counters = Arc::clone(&counters);
            let drain = drain.clone();
            let name = Arc::clone(&name);
            workers.push(tokio::spawn(run_worker(
                name, i, lane, listener, counters, drain,
            )));
        }

        Self {
            name,
            senders,
            shard: sub.shard.clone(),
            counters,
            workers: StdMutex::new(workers),
        }
    }

    /// Hands an event to its lane without blocking.
    pub(crate) fn dispatch(&self, ev: Event) -> Dispatch {
        let lane = match &self.shard {
            Some(shard) if self.senders.len() > 1 => {
                (shard(&ev) % self.senders.len() as u64) as usize
            }
            _ => 0,
        };

        if !self.counters.begin_pending() {
            self.counters.record_dropped(1);
            debug!(listener = %self.name, lane, seq = ev.seq, "pool abandoned; event dropped");
            return Dispatch::DroppedClosed;
        }
        match self.senders[lane].try_send(ev) {
            Ok(()) => Dispatch::Enqueued,
            Err(mpsc::error::TrySendError::Full(ev)) => {
                // Already written off if a drain abandoned the pool meanwhile.
                if self.counters.end_pending() {
                    self.counters.record_dropped(1);
                }
                debug!(listener = %self.name, lane, seq = ev.seq, "queue full; event dropped");
                Dispatch::DroppedFull
            }
            Err(mpsc::error::TrySendError::Closed(ev)) => {
                if self.counters.end_pending() {
                    self.counters.record_dropped(1);
                }
                debug!(listener = %self.name, lane, seq = ev.seq, "worker closed; event dropped");
                Dispatch::DroppedClosed
            }
        }
    }

    /// Takes the worker handles (empty on the second call).
    pub(crate) fn take_workers(&self) -> Vec<JoinHandle<()>> {
        match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub(crate) fn counters(&self) -> &Arc<ListenerCounters> {
        &self.counters
    }

    #[cfg(test)]
    pub(crate) fn lanes(&self) -> usize {
        self.senders.len()
    }
}

/// Worker loop: pull from the lane until it is closed, or drained and empty.
async fn run_worker(
    name: Arc<str>,
    worker: usize,
    lane: Lane,
    listener: Arc<dyn Listener>,
    counters: Arc<ListenerCounters>,
    drain: CancellationToken,
) {
    loop {
        let next = {
            let mut rx = lane.lock().await;
            tokio::select! {
                biased;
                ev = rx.recv() => ev,
                _ = drain.cancelled() => rx.try_recv().ok(),
            }
        };
        let Some(ev) = next else { break };
        if !counters.end_pending() {
            debug!(listener = %name, worker, seq = ev.seq, "pool abandoned; discarding queued events");
            break;
        }
        deliver(&name, worker, listener.as_ref(), &counters, ev).await;
    }
    debug!(listener = %name, worker, "worker stopped");
}

/// Runs `accept` for one event inside the isolation boundary.
async fn deliver(
    name: &str,
    worker: usize,
    listener: &dyn Listener,
    counters: &ListenerCounters,
    ev: Event,
) {
    let seq = ev.seq;
    counters.record_consumed();

    match std::panic::AssertUnwindSafe(listener.accept(ev))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            counters.record_failed();
            warn!(listener = %name, worker, seq, label = err.as_label(), error = %err, "listener failed to handle event");
        }
        Err(panic) => {
            counters.record_failed();
            error!(listener = %name, worker, seq, info = %panic_message(panic.as_ref()), "listener panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::events::EventType;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct Recorder {
        seen: StdMutex<Vec<u32>>,
    }

    #[async_trait]
    impl Listener for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn accept(&self, ev: Event) -> Result<(), HandlerError> {
            let v = ev.downcast_ref::<u32>().copied().unwrap_or_default();
            if v == 13 {
                panic!("unlucky");
            }
            if v == 7 {
                return Err(HandlerError::failed("seven"));
            }
            self.seen.lock().expect("lock").push(v);
            Ok(())
        }
    }

    fn ev(v: u32) -> Event {
        Event::custom(EventType::new("n"), v)
    }

    #[tokio::test]
    async fn worker_survives_errors_and_panics() {
        let rec = Arc::new(Recorder {
            seen: StdMutex::new(Vec::new()),
        });
        let sub = Subscription::new(rec.clone());
        let counters = Arc::new(ListenerCounters::new());
        let drain = CancellationToken::new();
        let pool = WorkerPool::spawn(&sub, 16, counters.clone(), drain.clone());

        for v in [1, 7, 13, 2] {
            assert_eq!(pool.dispatch(ev(v)), Dispatch::Enqueued);
        }
        drain.cancel();
        for h in pool.take_workers() {
            h.await.expect("worker join");
        }

        assert_eq!(*rec.seen.lock().expect("lock"), vec![1, 2]);
        assert_eq!(counters.total(), 4);
        assert_eq!(counters.failed(), 2);
        assert_eq!(counters.pending(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn full_lane_rejects_newest() {
        let rec = Arc::new(Recorder {
            seen: StdMutex::new(Vec::new()),
        });
        let sub = Subscription::new(rec.clone()).queue_capacity(2);
        let counters = Arc::new(ListenerCounters::new());
        let pool = WorkerPool::spawn(&sub, 2, counters.clone(), CancellationToken::new());

        // The worker has not been polled yet on this single-threaded runtime.
        assert_eq!(pool.dispatch(ev(1)), Dispatch::Enqueued);
        assert_eq!(pool.dispatch(ev(2)), Dispatch::Enqueued);
        assert_eq!(pool.dispatch(ev(3)), Dispatch::DroppedFull);
        assert_eq!(counters.dropped(), 1);
        assert_eq!(counters.pending(), 2);
        assert_eq!(pool.lanes(), 1);
    }

    #[tokio::test]
    async fn sharded_pool_has_one_lane_per_worker() {
        let rec = Arc::new(Recorder {
            seen: StdMutex::new(Vec::new()),
        });
        let sub = Subscription::new(rec)
            .parallelism(4)
            .shard_by(|ev: &Event| ev.seq);
        let pool = WorkerPool::spawn(
            &sub,
            8,
            Arc::new(ListenerCounters::new()),
            CancellationToken::new(),
        );
        assert_eq!(pool.lanes(), 4);
        assert_eq!(pool.take_workers().len(), 4);
        assert!(pool.take_workers().is_empty());
    }
}
