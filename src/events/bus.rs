//! # Weighted, shardable event-dispatch bus.
//!
//! [`Bus`] decouples producers (collectors, instrumentation call-sites) from consumers
//! ([`Listener`]s). Each subscription owns a bounded worker pool; `publish` picks exactly
//! one listener per event and hands the event to that listener's queue without waiting.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Routes (weight desc, then registration order):
//!   collector ──┐                          [w=150] report  ─► WorkerPool (P=4, sharded)
//!   call-site ──┼──► publish(ev) ──► ┬──►  [w=100] export  ─► WorkerPool (P=2, shared lane)
//!   call-site ──┘                    │     [w=MIN] log     ─► WorkerPool (P=1)
//!                                    └──► no match ─► unrouted += 1
//! ```
//!
//! ## Rules
//! - **First match wins**: routes are tried in weight order; the first whose type filter
//!   matches and whose `test` returns `true` consumes the event. No other listener sees it.
//! - **Non-blocking publish**: enqueue is `try_send`; a full queue rejects the newest
//!   event and counts it as dropped for that listener. Producers never wait.
//! - **Lock-free reads**: the route table is an [`ArcSwap`] snapshot; `subscribe` builds a
//!   new sorted table under a writer lock and swaps it in.
//! - **Bounded drain**: `drain(timeout)` stops intake, lets workers flush, and after the
//!   deadline aborts them; whatever was still queued is counted as dropped.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use pulsevisor::{Bus, BusConfig, Callback, Event, ReportListener};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = Bus::new(BusConfig::default());
//! bus.subscribe(ReportListener::subscription(4))?;
//!
//! bus.publish(Event::callback(Callback::new("http-client", || Ok(()))))?;
//!
//! let report = bus.drain(std::time::Duration::from_secs(1)).await;
//! assert!(report.completed);
//! # Ok(()) }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::BusConfig;
use crate::error::{PublishError, RegistrationError, panic_message};
use crate::events::{Event, EventType, Payload};
use crate::listeners::pool::WorkerPool;
use crate::listeners::{Listener, ListenerCounters, ListenerStats, Subscription, TypeFilter};

/// One registered listener in the route table.
struct Route {
    name: Arc<str>,
    listener: Arc<dyn Listener>,
    filter: TypeFilter,
    weight: i32,
    order: u64,
    pool: WorkerPool,
}

struct Inner {
    cfg: BusConfig,
    routes: ArcSwap<Vec<Arc<Route>>>,
    writer: Mutex<()>,
    next_order: AtomicU64,
    accepting: AtomicBool,
    draining: CancellationToken,
    unrouted: AtomicU64,
    rejected: AtomicU64,
}

/// Result of [`Bus::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// `true` if every worker finished before the deadline.
    pub completed: bool,
    /// Events still queued at the deadline, now counted as dropped.
    pub dropped: u64,
}

/// Event dispatch engine.
///
/// Cheap to clone; clones share the same route table and counters.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<Inner>,
}

impl Bus {
    /// Creates an empty bus.
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                cfg,
                routes: ArcSwap::from_pointee(Vec::new()),
                writer: Mutex::new(()),
                next_order: AtomicU64::new(0),
                accepting: AtomicBool::new(true),
                draining: CancellationToken::new(),
                unrouted: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
            }),
        }
    }

    /// Registers a listener and spawns its workers.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// ### Errors
    /// - [`RegistrationError::InvalidListener`] for a malformed registration or a draining bus
    /// - [`RegistrationError::DuplicateListener`] if the name is taken
    pub fn subscribe(&self, sub: Subscription) -> Result<(), RegistrationError> {
        sub.validate()?;
        let name: Arc<str> = Arc::from(sub.name());

        let _guard = self
            .inner
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !self.is_accepting() {
            return Err(RegistrationError::InvalidListener {
                name: name.to_string(),
                reason: "bus is draining",
            });
        }
        let current = self.inner.routes.load_full();
        if current.iter().any(|r| r.name == name) {
            return Err(RegistrationError::DuplicateListener {
                name: name.to_string(),
            });
        }

        let capacity = sub
            .queue_capacity
            .unwrap_or(self.inner.cfg.queue_capacity)
            .max(1);
        let counters = Arc::new(ListenerCounters::new());
        let pool = WorkerPool::spawn(&sub, capacity, counters, self.inner.draining.clone());

        let route = Arc::new(Route {
            name: Arc::clone(&name),
            filter: sub.listener.event_types(),
            listener: Arc::clone(&sub.listener),
            weight: sub.weight,
            order: self.inner.next_order.fetch_add(1, Ordering::Relaxed),
            pool,
        });

        let mut next: Vec<Arc<Route>> = current.iter().cloned().collect();
        next.push(route);
        next.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.order.cmp(&b.order)));
        self.inner.routes.store(Arc::new(next));

        debug!(
            listener = %name,
            weight = sub.weight,
            parallelism = sub.parallelism,
            sharded = sub.is_sharded(),
            capacity,
            "listener subscribed"
        );
        Ok(())
    }

    /// Routes an event to the first matching listener by weight.
    ///
    /// Never blocks. A full queue drops the event and counts it; so does a draining bus.
    ///
    /// ### Errors
    /// [`PublishError::NoListener`] only when no listener takes the event and
    /// `fail_on_missing_listener` is set.
    pub fn publish(&self, ev: Event) -> Result<(), PublishError> {
        if !self.is_accepting() {
            self.inner.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(seq = ev.seq, kind = %ev.kind, "bus draining; event rejected");
            return Ok(());
        }

        let routes = self.inner.routes.load();
        for route in routes.iter() {
            if !route.filter.matches(&ev.kind) || !passes_test(route, &ev) {
                continue;
            }
            route.pool.dispatch(ev);
            return Ok(());
        }

        self.inner.unrouted.fetch_add(1, Ordering::Relaxed);
        if self.inner.cfg.fail_on_missing_listener {
            return Err(PublishError::NoListener {
                event_type: ev.kind.to_string(),
            });
        }
        debug!(seq = ev.seq, kind = %ev.kind, "no listener for event");
        Ok(())
    }

    /// Fire-and-forget producer entry point.
    #[inline]
    pub fn emit(&self, kind: EventType, payload: Payload) {
        let _ = self.publish(Event::new(kind, payload));
    }

    /// Returns `true` until [`drain`](Self::drain) is called.
    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::Acquire)
    }

    /// Counters of the named listener.
    pub fn counters(&self, name: &str) -> Option<Arc<ListenerCounters>> {
        self.inner
            .routes
            .load()
            .iter()
            .find(|r| &*r.name == name)
            .map(|r| Arc::clone(r.pool.counters()))
    }

    /// Read-and-clear accessor for the named listener's period counter.
    pub fn take_period_consumed(&self, name: &str) -> Option<u64> {
        self.counters(name).map(|c| c.take_period())
    }

    /// Snapshot of every listener's counters, in dispatch order. Does not clear periods.
    pub fn stats(&self) -> Vec<ListenerStats> {
        self.collect_stats(false)
    }

    /// Like [`stats`](Self::stats) but reads-and-clears every period counter.
    pub fn take_stats(&self) -> Vec<ListenerStats> {
        self.collect_stats(true)
    }

    fn collect_stats(&self, clear_period: bool) -> Vec<ListenerStats> {
        self.inner
            .routes
            .load()
            .iter()
            .map(|r| r.pool.counters().snapshot(&r.name, clear_period))
            .collect()
    }

    /// Events no listener took.
    pub fn unrouted(&self) -> u64 {
        self.inner.unrouted.load(Ordering::Relaxed)
    }

    /// Events published after intake stopped.
    pub fn rejected(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed)
    }

    /// Sum of every listener's dropped counter.
    pub fn dropped_total(&self) -> u64 {
        self.inner
            .routes
            .load()
            .iter()
            .map(|r| r.pool.counters().dropped())
            .sum()
    }

    /// Listener names in dispatch order.
    pub fn listener_names(&self) -> Vec<String> {
        self.inner
            .routes
            .load()
            .iter()
            .map(|r| r.name.to_string())
            .collect()
    }

    /// Stops intake and flushes listener queues, waiting at most `timeout`.
    ///
    /// Workers that are still busy at the deadline are aborted; events they had not
    /// picked up are counted as dropped. With a zero timeout nothing is awaited.
    pub async fn drain(&self, timeout: Duration) -> DrainReport {
        self.inner.accepting.store(false, Ordering::Release);
        self.inner.draining.cancel();

        let routes = self.inner.routes.load_full();
        let mut handles = Vec::new();
        for route in routes.iter() {
            handles.extend(route.pool.take_workers());
        }

        let completed = if handles.is_empty() {
            true
        } else if timeout.is_zero() {
            for h in &handles {
                h.abort();
            }
            false
        } else {
            let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
            let joined = tokio::time::timeout(timeout, async {
                for h in handles {
                    let _ = h.await;
                }
            })
            .await;
            if joined.is_err() {
                for a in &aborts {
                    a.abort();
                }
            }
            joined.is_ok()
        };

        let mut dropped = 0;
        for route in routes.iter() {
            let n = route.pool.counters().abandon_pending();
            if n > 0 {
                warn!(listener = %route.name, dropped = n, "queued events discarded at drain");
            }
            dropped += n;
        }

        info!(completed, dropped, "bus drained");
        DrainReport { completed, dropped }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new(BusConfig::default())
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("listeners", &self.listener_names())
            .field("accepting", &self.is_accepting())
            .finish()
    }
}

/// Runs the listener's pre-filter; a panicking `test` counts as "no".
fn passes_test(route: &Route, ev: &Event) -> bool {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| route.listener.test(ev))) {
        Ok(hit) => hit,
        Err(panic) => {
            warn!(
                listener = %route.name,
                seq = ev.seq,
                info = %panic_message(panic.as_ref()),
                "listener test panicked; skipping"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::listeners::BASELINE_WEIGHT;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct Probe {
        name: &'static str,
        filter: TypeFilter,
        accept_odd_only: bool,
        seen: StdMutex<Vec<u32>>,
    }

    impl Probe {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                filter: TypeFilter::Any,
                accept_odd_only: false,
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<u32> {
            self.seen.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Listener for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn event_types(&self) -> TypeFilter {
            self.filter.clone()
        }

        fn test(&self, ev: &Event) -> bool {
            let v = ev.downcast_ref::<u32>().copied().unwrap_or_default();
            if v == 99 {
                panic!("bad test");
            }
            !self.accept_odd_only || v % 2 == 1
        }

        async fn accept(&self, ev: Event) -> Result<(), HandlerError> {
            let v = ev.downcast_ref::<u32>().copied().unwrap_or_default();
            self.seen.lock().expect("lock").push(v);
            Ok(())
        }
    }

    fn t(v: u32) -> Event {
        Event::custom(EventType::new("t"), v)
    }

    #[tokio::test]
    async fn heavier_listener_wins_and_ties_keep_registration_order() {
        let bus = Bus::default();
        let low = Probe::new("low");
        let first = Probe::new("first");
        let second = Probe::new("second");

        bus.subscribe(Subscription::new(low.clone()).weight(10)).unwrap();
        bus.subscribe(Subscription::new(first.clone())).unwrap();
        bus.subscribe(Subscription::new(second.clone())).unwrap();
        assert_eq!(bus.listener_names(), vec!["first", "second", "low"]);

        bus.publish(t(1)).unwrap();
        bus.drain(Duration::from_secs(1)).await;

        assert_eq!(first.seen(), vec![1]);
        assert!(second.seen().is_empty());
        assert!(low.seen().is_empty());
    }

    #[tokio::test]
    async fn test_false_or_panicking_falls_through() {
        let bus = Bus::default();
        let picky = Arc::new(Probe {
            name: "picky",
            filter: TypeFilter::Any,
            accept_odd_only: true,
            seen: StdMutex::new(Vec::new()),
        });
        let rest = Probe::new("rest");
        bus.subscribe(Subscription::new(picky.clone()).weight(BASELINE_WEIGHT + 1))
            .unwrap();
        bus.subscribe(Subscription::new(rest.clone())).unwrap();

        for v in [1, 2, 3] {
            bus.publish(t(v)).unwrap();
        }
        // `picky` panics in test(); `rest` panics too, so nobody takes it.
        bus.publish(t(99)).unwrap();
        bus.drain(Duration::from_secs(1)).await;

        assert_eq!(picky.seen(), vec![1, 3]);
        assert_eq!(rest.seen(), vec![2]);
        assert_eq!(bus.unrouted(), 1);
    }

    #[tokio::test]
    async fn type_filter_is_respected() {
        let bus = Bus::default();
        let traces = Arc::new(Probe {
            name: "traces",
            filter: TypeFilter::only([EventType::TRACE]),
            accept_odd_only: false,
            seen: StdMutex::new(Vec::new()),
        });
        bus.subscribe(Subscription::new(traces.clone())).unwrap();

        bus.publish(t(1)).unwrap();
        assert_eq!(bus.unrouted(), 1);
        bus.drain(Duration::from_secs(1)).await;
        assert!(traces.seen().is_empty());
    }

    #[tokio::test]
    async fn missing_listener_policy() {
        let bus = Bus::new(BusConfig {
            fail_on_missing_listener: true,
            ..BusConfig::default()
        });
        let err = bus.publish(t(1)).unwrap_err();
        assert_eq!(err.as_label(), "publish_no_listener");
        assert_eq!(bus.unrouted(), 1);

        let lenient = Bus::default();
        assert!(lenient.publish(t(1)).is_ok());
        assert_eq!(lenient.unrouted(), 1);
    }

    #[tokio::test]
    async fn duplicate_and_late_registrations_fail() {
        let bus = Bus::default();
        bus.subscribe(Subscription::new(Probe::new("a"))).unwrap();
        let err = bus.subscribe(Subscription::new(Probe::new("a"))).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateListener { .. }));

        bus.drain(Duration::ZERO).await;
        let err = bus.subscribe(Subscription::new(Probe::new("b"))).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidListener { .. }));

        bus.publish(t(1)).unwrap();
        assert_eq!(bus.rejected(), 1);
    }

    #[tokio::test]
    async fn counters_track_consumption() {
        let bus = Bus::default();
        let p = Probe::new("p");
        bus.subscribe(Subscription::new(p.clone())).unwrap();
        for v in 0..10 {
            bus.publish(t(v)).unwrap();
        }
        let report = bus.drain(Duration::from_secs(1)).await;
        assert!(report.completed);
        assert_eq!(report.dropped, 0);

        let stats = bus.stats();
        assert_eq!(stats[0].total, 10);
        assert_eq!(bus.take_period_consumed("p"), Some(10));
        assert_eq!(bus.take_period_consumed("p"), Some(0));
        assert_eq!(bus.take_period_consumed("missing"), None);
    }

    /// Blocks its worker thread inside `accept`, so an abort cannot reach it mid-event.
    struct Busy {
        accepted: AtomicU64,
    }

    #[async_trait]
    impl Listener for Busy {
        fn name(&self) -> &str {
            "busy"
        }

        async fn accept(&self, _ev: Event) -> Result<(), HandlerError> {
            std::thread::sleep(Duration::from_millis(50));
            self.accepted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn abandoned_events_are_never_delivered_after_drain() {
        let bus = Bus::default();
        let busy = Arc::new(Busy {
            accepted: AtomicU64::new(0),
        });
        bus.subscribe(Subscription::new(busy.clone())).unwrap();
        for v in 0..5 {
            bus.publish(t(v)).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let report = bus.drain(Duration::ZERO).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let counters = bus.counters("busy").unwrap();
        assert!(!report.completed);
        assert_eq!(counters.total() + counters.dropped(), 5);
        assert_eq!(counters.dropped(), report.dropped);
        assert_eq!(busy.accepted.load(Ordering::SeqCst), counters.total());
    }
}
