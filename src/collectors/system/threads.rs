use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::collectors::{Collector, MetricSnapshot};
use crate::error::CollectorError;

/// Live thread count of the current process.
///
/// sysinfo only lists threads on Linux; elsewhere every sample fails and the
/// schedule reports the other families without it.
pub struct ThreadCollector {
    system: System,
    pid: Option<Pid>,
}

impl ThreadCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for ThreadCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for ThreadCollector {
    fn family(&self) -> &str {
        "threads"
    }

    fn collect(&mut self) -> Result<MetricSnapshot, CollectorError> {
        let pid = self
            .pid
            .ok_or_else(|| CollectorError::failed("threads", "current pid unavailable"))?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            // The task list is read on every refresh; nothing else is needed.
            ProcessRefreshKind::nothing(),
        );
        let tasks = self
            .system
            .process(pid)
            .and_then(|p| p.tasks())
            .ok_or_else(|| CollectorError::failed("threads", "thread list unavailable"))?;

        Ok(MetricSnapshot::new("threads").with("thread_active", tasks.len()))
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn counts_at_least_the_calling_thread() {
        let snap = ThreadCollector::new().collect().expect("linux lists tasks");
        let (_, active) = &snap.fields()[0];
        assert!(active.as_f64().unwrap_or_default() >= 1.0);
    }
}
