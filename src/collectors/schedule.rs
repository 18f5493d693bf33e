//! # CollectorSchedule: the per-tick collect / merge / report pattern.
//!
//! Every metric family task follows the same tick:
//!
//! ```text
//! tick ─► for each collector: collect()  ── Err / panic ──► warn!, contributes nothing
//!              │ Ok(snapshot)
//!              ▼
//!         merge fields + "interval" ─► ReportPayload(path) ─► sink.report(report_key)
//!                                                                  │ Err
//!                                                                  └─► warn!, tick still Ok
//! ```
//!
//! Collectors are built from factories in `before_run`, so a schedule that never
//! starts never touches the OS. Sampling runs on the blocking pool: a slow or hung
//! collector holds a blocking thread and its own tick, never a runtime worker.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::collectors::collector::{Collector, CollectorFactory};
use crate::error::{CollectorError, TickError, panic_message};
use crate::report::{ReportPayload, ReportSink};
use crate::schedule::{ScheduledTask, TickContext};

/// Scheduled task that samples a set of collectors into one payload per tick.
pub struct CollectorSchedule {
    name: String,
    report_key: String,
    path: String,
    config_key: Option<String>,
    sink: Arc<dyn ReportSink>,
    factories: Vec<CollectorFactory>,
    collectors: Collectors,
}

type Collectors = Arc<Mutex<Vec<Box<dyn Collector>>>>;

impl CollectorSchedule {
    /// Creates a schedule named `name` reporting to `sink` under `name`, at `path`.
    pub fn new(name: impl Into<String>, path: impl Into<String>, sink: Arc<dyn ReportSink>) -> Self {
        let name = name.into();
        Self {
            report_key: name.clone(),
            name,
            path: path.into(),
            config_key: None,
            sink,
            factories: Vec::new(),
            collectors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Overrides the destination key passed to the sink.
    pub fn report_key(mut self, key: impl Into<String>) -> Self {
        self.report_key = key.into();
        self
    }

    /// Binds the interval to a configuration key.
    pub fn config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = Some(key.into());
        self
    }

    /// Adds a collector factory.
    pub fn collector<F, C>(mut self, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Collector + 'static,
    {
        self.factories
            .push(Box::new(move || Box::new(factory()) as Box<dyn Collector>));
        self
    }

    /// Samples every collector off the async runtime.
    async fn sample(&self, tick: u64) -> Result<ReportPayload, TickError> {
        let collectors = Arc::clone(&self.collectors);
        let name = self.name.clone();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || sample_blocking(&collectors, &name, path, tick))
            .await
            .map_err(|err| TickError::Panicked {
                info: err.to_string(),
            })
    }
}

fn lock(collectors: &Collectors) -> MutexGuard<'_, Vec<Box<dyn Collector>>> {
    collectors
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Samples every collector, isolating failures per collector.
fn sample_blocking(collectors: &Collectors, name: &str, path: String, tick: u64) -> ReportPayload {
    let mut payload = ReportPayload::new(path);
    let mut collectors = lock(collectors);
    for collector in collectors.iter_mut() {
        let family = collector.family().to_string();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            collector.collect()
        }))
        .unwrap_or_else(|panic| {
            Err(CollectorError::Panicked {
                family: family.clone(),
                info: panic_message(panic.as_ref()),
            })
        });

        match result {
            Ok(snapshot) => payload.extend(snapshot.into_fields()),
            Err(err) => {
                warn!(task = %name, tick, family = %family, label = err.as_label(), error = %err, "collector failed; skipping its fields");
            }
        }
    }
    payload
}

#[async_trait]
impl ScheduledTask for CollectorSchedule {
    fn name(&self) -> &str {
        &self.name
    }

    fn config_key(&self) -> Option<&str> {
        self.config_key.as_deref()
    }

    async fn before_run(&self) -> Result<(), TickError> {
        let built: Vec<Box<dyn Collector>> = self.factories.iter().map(|f| f()).collect();
        debug!(task = %self.name, collectors = built.len(), "collectors ready");
        *lock(&self.collectors) = built;
        Ok(())
    }

    async fn execute(&self, ctx: &TickContext) -> Result<(), TickError> {
        let mut payload = self.sample(ctx.tick).await?;
        payload.insert("interval", ctx.interval_secs());

        if let Err(err) = self.sink.report(&self.report_key, payload).await {
            warn!(task = %self.name, key = %self.report_key, label = err.as_label(), error = %err, "report failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::MetricSnapshot;
    use crate::error::ReportError;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Fixed(&'static str, u64);

    impl Collector for Fixed {
        fn family(&self) -> &str {
            self.0
        }

        fn collect(&mut self) -> Result<MetricSnapshot, CollectorError> {
            Ok(MetricSnapshot::new(self.0).with(format!("{}_value", self.0), self.1))
        }
    }

    struct Failing;

    impl Collector for Failing {
        fn family(&self) -> &str {
            "gc"
        }

        fn collect(&mut self) -> Result<MetricSnapshot, CollectorError> {
            Err(CollectorError::failed("gc", "counters unavailable"))
        }
    }

    struct Panicking;

    impl Collector for Panicking {
        fn family(&self) -> &str {
            "classes"
        }

        fn collect(&mut self) -> Result<MetricSnapshot, CollectorError> {
            panic!("class table gone")
        }
    }

    #[derive(Default)]
    struct Capture {
        got: Mutex<Vec<(String, ReportPayload)>>,
    }

    #[async_trait]
    impl ReportSink for Capture {
        async fn report(&self, key: &str, payload: ReportPayload) -> Result<(), ReportError> {
            self.got.lock().unwrap().push((key.to_string(), payload));
            Ok(())
        }
    }

    struct Refusing;

    #[async_trait]
    impl ReportSink for Refusing {
        async fn report(&self, _key: &str, _payload: ReportPayload) -> Result<(), ReportError> {
            Err(ReportError::Closed)
        }
    }

    fn ctx() -> TickContext {
        TickContext {
            interval: Duration::from_secs(5),
            tick: 1,
            token: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn failing_families_do_not_hide_the_others() {
        let sink = Arc::new(Capture::default());
        let task = CollectorSchedule::new("jvmMetric", "status/resources", sink.clone())
            .config_key("metricOutput.interval.jvm")
            .collector(|| Fixed("memory", 10))
            .collector(|| Failing)
            .collector(|| Panicking)
            .collector(|| Fixed("threads", 7));

        task.before_run().await.unwrap();
        task.execute(&ctx()).await.unwrap();

        let got = sink.got.lock().unwrap();
        let (key, payload) = &got[0];
        assert_eq!(key, "jvmMetric");
        assert_eq!(payload.path(), "status/resources");
        assert!(payload.contains_key("memory_value"));
        assert!(payload.contains_key("threads_value"));
        assert_eq!(payload.get("interval").and_then(|v| v.as_f64()), Some(5.0));
        assert_eq!(payload.len(), 3);
    }

    #[tokio::test]
    async fn sink_errors_do_not_fail_the_tick() {
        let task = CollectorSchedule::new("t", "p", Arc::new(Refusing)).collector(|| Fixed("memory", 1));
        task.before_run().await.unwrap();
        assert!(task.execute(&ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn nothing_is_sampled_before_setup() {
        let sink = Arc::new(Capture::default());
        let task = CollectorSchedule::new("t", "p", sink.clone())
            .report_key("custom")
            .collector(|| Fixed("memory", 1));
        task.execute(&ctx()).await.unwrap();

        let got = sink.got.lock().unwrap();
        assert_eq!(got[0].0, "custom");
        assert_eq!(got[0].1.len(), 1);
    }

    struct Sleepy(Duration);

    impl Collector for Sleepy {
        fn family(&self) -> &str {
            "sleepy"
        }

        fn collect(&mut self) -> Result<MetricSnapshot, CollectorError> {
            std::thread::sleep(self.0);
            Ok(MetricSnapshot::new("sleepy").with("slept", 1u64))
        }
    }

    #[tokio::test]
    async fn slow_collectors_leave_the_runtime_free() {
        let sink = Arc::new(Capture::default());
        let task = Arc::new(
            CollectorSchedule::new("slow", "p", sink.clone())
                .collector(|| Sleepy(Duration::from_millis(300))),
        );
        task.before_run().await.unwrap();

        let begun = std::time::Instant::now();
        let running = {
            let task = Arc::clone(&task);
            tokio::spawn(async move { task.execute(&ctx()).await })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Timers and other tasks on this single-threaded runtime still run.
        assert!(begun.elapsed() < Duration::from_millis(250));
        assert!(!running.is_finished());

        running.await.unwrap().unwrap();
        let got = sink.got.lock().unwrap();
        assert!(got[0].1.contains_key("slept"));
    }
}
