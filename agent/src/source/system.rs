//! Host memory and CPU sampling

use sysinfo::System;

use super::{SampleSource, push_gauge};
use crate::model::Metric;

pub const TOTAL_MEMORY: &str = "TotalMemory";
pub const FREE_MEMORY: &str = "FreeMemory";
pub const USED_MEMORY: &str = "UsedMemory";

/// Per-CPU utilization gauges are numbered from 1: `CPUutilization1`, ...
pub const CPU_UTILIZATION_PREFIX: &str = "CPUutilization";

pub struct SystemSource {
    system: System,
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSource {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl SampleSource for SystemSource {
    fn name(&self) -> &str {
        "system"
    }

    fn collect(&mut self) -> Vec<Metric> {
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();

        let cpus = self.system.cpus();
        let mut samples = Vec::with_capacity(3 + cpus.len());

        push_gauge(&mut samples, TOTAL_MEMORY, self.system.total_memory() as f64);
        push_gauge(&mut samples, FREE_MEMORY, self.system.free_memory() as f64);
        push_gauge(&mut samples, USED_MEMORY, self.system.used_memory() as f64);

        for (index, cpu) in cpus.iter().enumerate() {
            let id = format!("{}{}", CPU_UTILIZATION_PREFIX, index + 1);
            push_gauge(&mut samples, &id, cpu.cpu_usage() as f64);
        }

        tracing::debug!(count = samples.len(), "Collected system metrics");
        samples
    }
}
