//! Sample sources
//!
//! A source takes one snapshot of named readings and maps each reading to a
//! [`Metric`] of the right kind. Every source is owned by exactly one
//! collector task, so `collect` takes `&mut self` and needs no locking.

mod runtime;
mod system;

pub use runtime::RuntimeSource;
pub use system::SystemSource;

use crate::model::Metric;

pub trait SampleSource: Send {
    /// Source name used in logs
    fn name(&self) -> &str;

    /// Take one full snapshot
    fn collect(&mut self) -> Vec<Metric>;
}

/// The agent's standard sources, one collector each
pub fn default_sources() -> Vec<Box<dyn SampleSource>> {
    vec![
        Box::new(RuntimeSource::new()),
        Box::new(SystemSource::new()),
    ]
}

/// Push a gauge reading, skipping values the model rejects
pub(crate) fn push_gauge(out: &mut Vec<Metric>, id: &str, value: f64) {
    match Metric::gauge(id, value) {
        Ok(metric) => out.push(metric),
        Err(e) => tracing::debug!(metric_id = id, error = %e, "Skipping sample"),
    }
}
