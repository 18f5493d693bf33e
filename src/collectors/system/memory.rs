use sysinfo::System;

use crate::collectors::{Collector, MetricSnapshot};
use crate::error::CollectorError;

/// Total and used system memory, in bytes.
pub struct MemoryCollector {
    system: System,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for MemoryCollector {
    fn family(&self) -> &str {
        "memory"
    }

    fn collect(&mut self) -> Result<MetricSnapshot, CollectorError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(CollectorError::failed("memory", "total memory reported as 0"));
        }
        Ok(MetricSnapshot::new("memory")
            .with("sys_mem_total", total)
            .with("sys_mem_used", self.system.used_memory()))
    }
}
