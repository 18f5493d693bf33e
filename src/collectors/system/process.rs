use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::collectors::{Collector, MetricSnapshot};
use crate::error::CollectorError;

/// CPU and memory usage of the current process.
///
/// CPU usage is a delta between refreshes, so the first sample reads 0.
pub struct ProcessCollector {
    system: System,
    pid: Option<Pid>,
}

impl ProcessCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for ProcessCollector {
    fn family(&self) -> &str {
        "process"
    }

    fn collect(&mut self) -> Result<MetricSnapshot, CollectorError> {
        let pid = self
            .pid
            .ok_or_else(|| CollectorError::failed("process", "current pid unavailable"))?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        let process = self
            .system
            .process(pid)
            .ok_or_else(|| CollectorError::failed("process", format!("pid {pid} not found")))?;

        let cpu = process.cpu_usage();
        Ok(MetricSnapshot::new("process")
            .with("cpu", if cpu.is_finite() { f64::from(cpu) } else { 0.0 })
            .with("memory_total", process.memory())
            .with("virtual_memory", process.virtual_memory()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_the_current_process() {
        let mut c = ProcessCollector::new();
        let snap = c.collect().expect("own process is visible");
        assert_eq!(snap.family(), "process");
        assert!(snap.fields().iter().any(|(k, _)| k == "memory_total"));
    }
}
