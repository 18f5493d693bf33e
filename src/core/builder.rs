use std::sync::Arc;

use tracing::debug;

use crate::collectors::ThroughputSchedule;
use crate::core::{Config, Pipeline, Settings};
use crate::error::RegistrationError;
use crate::events::Bus;
use crate::listeners::Subscription;
use crate::report::{LogSink, ReportSink};
use crate::schedule::{Scheduler, TaskRef};

/// Builder for constructing a [`Pipeline`].
pub struct PipelineBuilder {
    cfg: Config,
    settings: Settings,
    sink: Arc<dyn ReportSink>,
    listeners: Vec<Subscription>,
    tasks: Vec<(TaskRef, Option<u64>)>,
    throughput: bool,
    #[cfg(feature = "system-collectors")]
    process_metrics: bool,
}

impl PipelineBuilder {
    /// Creates a builder with the given configuration and a [`LogSink`].
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            settings: Settings::new(),
            sink: Arc::new(LogSink),
            listeners: Vec::new(),
            tasks: Vec::new(),
            throughput: false,
            #[cfg(feature = "system-collectors")]
            process_metrics: false,
        }
    }

    /// Dotted-key overrides: global keys patch the [`Config`], interval keys the tasks.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Sink used by the built-in metric tasks.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Adds a listener registration.
    pub fn with_listener(mut self, sub: Subscription) -> Self {
        self.listeners.push(sub);
        self
    }

    /// Adds a task with an explicit interval in seconds.
    pub fn with_task(mut self, task: TaskRef, interval_secs: u64) -> Self {
        self.tasks.push((task, Some(interval_secs)));
        self
    }

    /// Adds a task using `Config::default_interval_secs`.
    pub fn with_default_task(mut self, task: TaskRef) -> Self {
        self.tasks.push((task, None));
        self
    }

    /// Registers the bus self-metrics task ([`ThroughputSchedule`]).
    pub fn with_throughput_metrics(mut self) -> Self {
        self.throughput = true;
        self
    }

    /// Registers the process health task (`CollectorSchedule::process_metrics`).
    ///
    /// Requires the `system-collectors` feature flag.
    #[cfg(feature = "system-collectors")]
    pub fn with_process_metrics(mut self) -> Self {
        self.process_metrics = true;
        self
    }

    /// Builds the pipeline.
    ///
    /// Must be called inside a Tokio runtime (listener workers are spawned here).
    /// Applies settings in order: global keys → [`Config`], then per-task interval keys.
    ///
    /// ### Errors
    /// The first [`RegistrationError`] from a listener or task.
    pub fn build(mut self) -> Result<Pipeline, RegistrationError> {
        self.cfg.apply(&self.settings);

        let bus = Bus::new(self.cfg.bus.clone());
        for sub in self.listeners {
            bus.subscribe(sub)?;
        }

        let scheduler = Scheduler::from_config(&self.cfg);
        for (task, interval) in self.tasks {
            match interval {
                Some(secs) => scheduler.register(task, secs)?,
                None => scheduler.register_default(task)?,
            }
        }
        if self.throughput {
            let task = ThroughputSchedule::new(bus.clone(), Arc::clone(&self.sink));
            scheduler.register_default(Arc::new(task))?;
        }
        #[cfg(feature = "system-collectors")]
        if self.process_metrics {
            let task = crate::collectors::CollectorSchedule::process_metrics(Arc::clone(&self.sink));
            scheduler.register_default(Arc::new(task))?;
        }

        let ignored = scheduler.configure_all(&self.settings).len();
        if ignored > 0 {
            debug!(ignored, "some task settings were ignored");
        }

        Ok(Pipeline::new(self.cfg, bus, Arc::new(scheduler)))
    }
}
