//! # Scheduler: registry and lifecycle of periodic tasks.
//!
//! The [`Scheduler`] owns a table of [`ScheduledTask`]s, each with its own interval in
//! whole seconds, and runs one fixed-rate ticker per task on the Tokio runtime.
//!
//! ## Architecture
//! ```text
//! register(task, secs) ──► task table (frozen at start)
//! configure(key, value) ─┘
//!
//! start():
//!   for each task:
//!     before_run() ── Err/panic ──► error!, task skipped
//!          │        ── stop() meanwhile ──► setup abandoned, start returns
//!          │ Ok
//!          ▼
//!     tokio::spawn(run_ticker) ──► execute() every interval (never overlapping)
//!
//! stop(timeout):
//!   cancel token ─► shutdown(timeout) on every task (concurrently)
//!                ─► join tickers until the deadline
//!                     ├─ all joined → Ok
//!                     └─ deadline   → abort rest, Err(GraceExceeded { stuck })
//! ```
//!
//! ## Rules
//! - Task names are unique; duplicates fail with [`RegistrationError::DuplicateTask`].
//! - Intervals change only before `start()`. Bad values are logged and the previous
//!   value is kept.
//! - `stop` returns within `timeout` (plus scheduling slack), whatever the tasks do.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use pulsevisor::{ScheduleFn, Scheduler, TickContext, TickError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::new();
//!     let jvm = ScheduleFn::new("jvmMetric", |_ctx: TickContext| async { Ok::<_, TickError>(()) })
//!         .with_config_key("metricOutput.interval.jvm")
//!         .into_ref();
//!     scheduler.register(jvm, 5)?;
//!     scheduler.configure("metricOutput.interval.jvm", "10")?;
//!     assert_eq!(scheduler.interval_secs("jvmMetric"), Some(10));
//!
//!     scheduler.start().await;
//!     scheduler.stop(Duration::from_secs(1)).await?;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::{Config, Settings};
use crate::error::{ConfigParseError, RegistrationError, RuntimeError, TickError, panic_message};
use crate::schedule::task::TaskRef;
use crate::schedule::ticker::{TaskCounters, TaskStats, run_ticker};

/// Prefix of per-task interval keys.
pub const INTERVAL_KEY_PREFIX: &str = "metricOutput.interval.";

struct Entry {
    task: TaskRef,
    interval_secs: u64,
    counters: Arc<TaskCounters>,
}

impl Entry {
    fn name(&self) -> &str {
        self.task.name()
    }
}

/// Periodic task scheduler.
pub struct Scheduler {
    default_interval: u64,
    entries: Mutex<Vec<Entry>>,
    started: AtomicBool,
    token: CancellationToken,
    tickers: tokio::sync::Mutex<JoinSet<()>>,
}

impl Scheduler {
    /// Creates an empty scheduler with a 5-second default interval.
    pub fn new() -> Self {
        Self::with_default_interval(Config::default().default_interval())
    }

    /// Creates an empty scheduler using `config.default_interval_secs`.
    pub fn from_config(config: &Config) -> Self {
        Self::with_default_interval(config.default_interval())
    }

    fn with_default_interval(secs: u64) -> Self {
        Self {
            default_interval: secs.max(1),
            entries: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            token: CancellationToken::new(),
            tickers: tokio::sync::Mutex::new(JoinSet::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a task with an interval in whole seconds.
    ///
    /// ### Errors
    /// - [`RegistrationError::DuplicateTask`] if the name is taken
    /// - [`RegistrationError::InvalidInterval`] for `0`
    /// - [`RegistrationError::AlreadyStarted`] after [`start`](Self::start)
    pub fn register(&self, task: TaskRef, interval_secs: u64) -> Result<(), RegistrationError> {
        let name = task.name().to_string();
        if self.is_started() {
            return Err(RegistrationError::AlreadyStarted { name });
        }
        if interval_secs == 0 {
            return Err(RegistrationError::InvalidInterval {
                name,
                secs: interval_secs,
            });
        }

        let mut entries = self.entries();
        if entries.iter().any(|e| e.name() == name) {
            return Err(RegistrationError::DuplicateTask { name });
        }
        entries.push(Entry {
            task,
            interval_secs,
            counters: Arc::new(TaskCounters::default()),
        });
        debug!(task = %name, interval_secs, "task registered");
        Ok(())
    }

    /// Adds a task with the scheduler's default interval.
    pub fn register_default(&self, task: TaskRef) -> Result<(), RegistrationError> {
        self.register(task, self.default_interval)
    }

    /// Applies one per-task interval setting.
    ///
    /// Never fatal: on any error the previous interval is kept and a warning is logged.
    pub fn configure(&self, key: &str, value: &str) -> Result<(), ConfigParseError> {
        if self.is_started() {
            warn!(key, value, "scheduler already started; ignoring configuration");
            return Err(ConfigParseError::Frozen {
                key: key.to_string(),
            });
        }

        let mut entries = self.entries();
        let Some(entry) = entries
            .iter_mut()
            .find(|e| e.task.config_key() == Some(key))
        else {
            warn!(key, value, "no task uses this configuration key; ignoring");
            return Err(ConfigParseError::UnknownKey {
                key: key.to_string(),
            });
        };

        match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => {
                info!(task = entry.name(), key, from = entry.interval_secs, to = secs, "interval updated");
                entry.interval_secs = secs;
                Ok(())
            }
            _ => {
                warn!(
                    task = entry.name(),
                    key,
                    value,
                    keep = entry.interval_secs,
                    "invalid interval value; keeping previous interval"
                );
                Err(ConfigParseError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
        }
    }

    /// Applies every per-task key in `settings`.
    ///
    /// Keys outside the `metricOutput.interval.` namespace are left to other
    /// consumers. Returns the errors that were recovered from.
    pub fn configure_all(&self, settings: &Settings) -> Vec<ConfigParseError> {
        settings
            .iter()
            .filter(|(key, _)| key.starts_with(INTERVAL_KEY_PREFIX))
            .filter_map(|(key, value)| self.configure(key, value).err())
            .collect()
    }

    /// Effective interval of a task, in seconds.
    pub fn interval_secs(&self, name: &str) -> Option<u64> {
        self.entries()
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.interval_secs)
    }

    /// Tick counters of a task.
    pub fn stats(&self, name: &str) -> Option<TaskStats> {
        self.entries()
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.counters.snapshot())
    }

    /// Registered task names, in registration order.
    pub fn task_names(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.name().to_string()).collect()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Runs every task's `before_run`, then starts its ticker.
    ///
    /// Returns the number of tasks that started. A second call does nothing.
    pub async fn start(&self) -> usize {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("scheduler already started");
            return 0;
        }

        let plan: Vec<(TaskRef, Duration, Arc<TaskCounters>)> = self
            .entries()
            .iter()
            .map(|e| {
                (
                    Arc::clone(&e.task),
                    Duration::from_secs(e.interval_secs),
                    Arc::clone(&e.counters),
                )
            })
            .collect();

        let mut started = 0;
        for (task, interval, counters) in plan {
            let setup = tokio::select! {
                biased;
                _ = self.token.cancelled() => None,
                res = std::panic::AssertUnwindSafe(task.before_run()).catch_unwind() => Some(res),
            };
            let Some(setup) = setup else {
                warn!(task = task.name(), "scheduler stopped during setup; remaining tasks will not run");
                break;
            };
            let setup = setup.unwrap_or_else(|panic| {
                Err(TickError::Panicked {
                    info: panic_message(panic.as_ref()),
                })
            });
            if let Err(err) = setup {
                error!(task = task.name(), label = err.as_label(), error = %err, "setup failed; task will not run");
                continue;
            }

            // Held only around the spawn; `stop` cancels before it locks.
            let mut tickers = self.tickers.lock().await;
            if self.token.is_cancelled() {
                break;
            }
            info!(task = task.name(), ?interval, "task started");
            tickers.spawn(run_ticker(task, interval, self.token.clone(), counters));
            started += 1;
        }
        started
    }

    /// Stops every task, waiting at most `timeout`.
    ///
    /// ### Errors
    /// [`RuntimeError::GraceExceeded`] listing the tasks whose ticker or `shutdown` did
    /// not finish in time; they are abandoned.
    pub async fn stop(&self, timeout: Duration) -> Result<(), RuntimeError> {
        self.token.cancel();
        let deadline = tokio::time::Instant::now() + timeout;

        let tasks: Vec<(TaskRef, Arc<TaskCounters>)> = self
            .entries()
            .iter()
            .map(|e| (Arc::clone(&e.task), Arc::clone(&e.counters)))
            .collect();

        let shutdowns = join_all(tasks.iter().map(|(task, _)| async move {
            let released = tokio::time::timeout_at(deadline, task.shutdown(timeout))
                .await
                .unwrap_or(false);
            (task.name().to_string(), released)
        }));

        let joined = async {
            let results = shutdowns.await;
            let mut tickers = self.tickers.lock().await;
            while tickers.join_next().await.is_some() {}
            results
        };

        let mut stuck: Vec<String> = match tokio::time::timeout_at(deadline, joined).await {
            Ok(results) => results
                .into_iter()
                .filter(|(_, released)| !released)
                .map(|(name, _)| name)
                .collect(),
            Err(_) => tasks
                .iter()
                .filter(|(_, counters)| counters.is_running())
                .map(|(task, _)| task.name().to_string())
                .collect(),
        };
        self.tickers.lock().await.abort_all();

        if stuck.is_empty() {
            info!("scheduler stopped");
            return Ok(());
        }
        stuck.sort();
        stuck.dedup();
        warn!(?stuck, ?timeout, "scheduler stop timed out; abandoning tasks");
        Err(RuntimeError::GraceExceeded {
            grace: timeout,
            stuck,
        })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
