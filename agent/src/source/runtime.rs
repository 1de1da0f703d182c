//! Agent process sampling

use sysinfo::{Pid, ProcessesToUpdate, System};

use super::{SampleSource, push_gauge};
use crate::model::Metric;

pub const PROCESS_RESIDENT_MEMORY: &str = "ProcessResidentMemory";
pub const PROCESS_VIRTUAL_MEMORY: &str = "ProcessVirtualMemory";
pub const PROCESS_CPU_USAGE: &str = "ProcessCpuUsage";
pub const PROCESS_RUN_TIME: &str = "ProcessRunTime";
pub const RANDOM_VALUE: &str = "RandomValue";
pub const POLL_COUNT: &str = "PollCount";

/// Samples the agent's own process plus the `RandomValue` gauge and the
/// `PollCount` counter (delta 1 per snapshot)
pub struct RuntimeSource {
    system: System,
    pid: Option<Pid>,
}

impl Default for RuntimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeSource {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "Process metrics unavailable");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
        }
    }
}

impl SampleSource for RuntimeSource {
    fn name(&self) -> &str {
        "runtime"
    }

    fn collect(&mut self) -> Vec<Metric> {
        let mut samples = Vec::with_capacity(6);

        if let Some(pid) = self.pid {
            self.system
                .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            if let Some(process) = self.system.process(pid) {
                push_gauge(&mut samples, PROCESS_RESIDENT_MEMORY, process.memory() as f64);
                push_gauge(
                    &mut samples,
                    PROCESS_VIRTUAL_MEMORY,
                    process.virtual_memory() as f64,
                );
                push_gauge(&mut samples, PROCESS_CPU_USAGE, process.cpu_usage() as f64);
                push_gauge(&mut samples, PROCESS_RUN_TIME, process.run_time() as f64);
            }
        }

        push_gauge(&mut samples, RANDOM_VALUE, rand::random::<f64>());

        match Metric::counter(POLL_COUNT, 1) {
            Ok(metric) => samples.push(metric),
            Err(e) => tracing::debug!(error = %e, "Skipping poll counter"),
        }

        tracing::debug!(count = samples.len(), "Collected runtime metrics");
        samples
    }
}
