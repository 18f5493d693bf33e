//! sysinfo-backed collectors for the agent's own process.
//!
//! | Collector          | Family    | Fields                                       |
//! |--------------------|-----------|----------------------------------------------|
//! | [`ProcessCollector`] | `process` | `cpu`, `memory_total`, `virtual_memory`    |
//! | [`MemoryCollector`]  | `memory`  | `sys_mem_total`, `sys_mem_used`            |
//! | [`ThreadCollector`]  | `threads` | `thread_active`                            |

use std::sync::Arc;

use crate::collectors::CollectorSchedule;
use crate::report::ReportSink;

mod memory;
mod process;
mod threads;

pub use memory::MemoryCollector;
pub use process::ProcessCollector;
pub use threads::ThreadCollector;

impl CollectorSchedule {
    /// Task name and report key of [`process_metrics`](Self::process_metrics).
    pub const PROCESS_METRICS: &'static str = "processMetric";
    /// Interval key of [`process_metrics`](Self::process_metrics).
    pub const PROCESS_INTERVAL_KEY: &'static str = "metricOutput.interval.process";
    /// Destination path of [`process_metrics`](Self::process_metrics).
    pub const RESOURCES_PATH: &'static str = "status/resources";

    /// Process health task: CPU, memory and thread count of this process plus
    /// system memory, reported under `processMetric`.
    pub fn process_metrics(sink: Arc<dyn ReportSink>) -> Self {
        CollectorSchedule::new(Self::PROCESS_METRICS, Self::RESOURCES_PATH, sink)
            .config_key(Self::PROCESS_INTERVAL_KEY)
            .collector(ProcessCollector::new)
            .collector(MemoryCollector::new)
            .collector(ThreadCollector::new)
    }
}
