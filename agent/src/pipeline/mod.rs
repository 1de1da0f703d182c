//! Collection and delivery pipeline
//!
//! ```text
//! collectors (one per source) ──► bounded channel ──► workers ──► sender
//!                                                        │
//!                                                        └─► accumulator ──► reporter (batch mode)
//! ```
//!
//! A full channel blocks collectors. On shutdown collectors stop ticking and
//! drop their senders; workers drain the channel until it is closed and empty.
//! In batch mode the accumulator is flushed once more after every worker has
//! returned.

mod accumulator;
mod error;
mod readiness;

pub use accumulator::MetricAccumulator;
pub use error::AgentError;
pub use readiness::{ReadinessPolicy, wait_until_ready};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use crate::model::Metric;
use crate::sender::{HealthProbe, MetricSender};
use crate::source::SampleSource;

/// How workers hand metrics to the sender
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// One request per metric
    #[default]
    Single,
    /// Accumulate and send on the report interval
    Batch,
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMode::Single => write!(f, "single"),
            DeliveryMode::Batch => write!(f, "batch"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub poll_interval: Duration,
    pub report_interval: Duration,
    pub channel_size: usize,
    pub workers: usize,
    pub delivery: DeliveryMode,
    pub readiness: ReadinessPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    WaitingForServer,
    Running,
    Draining,
    Stopped,
}

pub struct AgentPipeline {
    settings: PipelineSettings,
    sources: Vec<Box<dyn SampleSource>>,
    sender: Arc<dyn MetricSender>,
    probe: Arc<dyn HealthProbe>,
    state_tx: watch::Sender<PipelineState>,
}

impl AgentPipeline {
    pub fn new(
        settings: PipelineSettings,
        sources: Vec<Box<dyn SampleSource>>,
        sender: Arc<dyn MetricSender>,
        probe: Arc<dyn HealthProbe>,
    ) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::WaitingForServer);
        Self {
            settings,
            sources,
            sender,
            probe,
            state_tx,
        }
    }

    /// Observe state transitions
    pub fn state(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    /// Run until shutdown, then join every task
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), AgentError> {
        let Self {
            settings,
            sources,
            sender,
            probe,
            state_tx,
        } = self;

        tracing::debug!(settings = ?settings, "Waiting for server");
        if let Err(e) = wait_until_ready(probe.as_ref(), &settings.readiness, &mut shutdown_rx).await
        {
            state_tx.send_replace(PipelineState::Stopped);
            return Err(e);
        }

        state_tx.send_replace(PipelineState::Running);
        tracing::info!(
            collectors = sources.len(),
            workers = settings.workers,
            delivery = %settings.delivery,
            "Pipeline started"
        );

        let (tx, rx) = mpsc::channel(settings.channel_size);
        let rx = Arc::new(Mutex::new(rx));

        let delivery = match settings.delivery {
            DeliveryMode::Single => Delivery::Direct(sender.clone()),
            DeliveryMode::Batch => Delivery::Accumulate(Arc::new(MetricAccumulator::new())),
        };

        let mut tasks = JoinSet::new();
        for source in sources {
            tasks.spawn(run_collector(
                source,
                tx.clone(),
                settings.poll_interval,
                shutdown_rx.clone(),
            ));
        }
        // Channel closes once the last collector drops its clone
        drop(tx);

        for worker_id in 0..settings.workers {
            tasks.spawn(run_worker(
                worker_id,
                rx.clone(),
                delivery.clone(),
                shutdown_rx.clone(),
            ));
        }

        let reporter = match &delivery {
            Delivery::Accumulate(accumulator) => Some((
                accumulator.clone(),
                tokio::spawn(run_reporter(
                    accumulator.clone(),
                    sender.clone(),
                    settings.report_interval,
                    shutdown_rx.clone(),
                )),
            )),
            Delivery::Direct(_) => None,
        };

        let mut failed = 0usize;
        let mut draining = false;
        loop {
            tokio::select! {
                _ = shutdown_signalled(&mut shutdown_rx), if !draining => {
                    draining = true;
                    state_tx.send_replace(PipelineState::Draining);
                    tracing::info!("Pipeline draining");
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => {
                        failed += 1;
                        tracing::error!(error = %e, "Pipeline task failed");
                    }
                    None => break,
                },
            }
        }

        if let Some((accumulator, handle)) = reporter {
            if let Err(e) = handle.await {
                failed += 1;
                tracing::error!(error = %e, "Reporter task failed");
            }
            flush_batch(&accumulator, sender.as_ref()).await;
        }

        state_tx.send_replace(PipelineState::Stopped);
        if failed > 0 {
            return Err(AgentError::TaskFailed { failed });
        }
        tracing::info!("Pipeline stopped");
        Ok(())
    }
}

// =============================================================================
// Tasks
// =============================================================================

async fn run_collector(
    mut source: Box<dyn SampleSource>,
    tx: mpsc::Sender<Metric>,
    poll_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Separate receiver for pushes; the select arm below borrows the other
    let mut push_rx = shutdown_rx.clone();

    loop {
        tokio::select! {
            biased;
            _ = shutdown_signalled(&mut shutdown_rx) => break,
            _ = ticker.tick() => {
                let metrics = source.collect();
                tracing::trace!(source = source.name(), count = metrics.len(), "Collected");
                if !push_all(&tx, metrics, &mut push_rx).await {
                    break;
                }
            }
        }
    }
    tracing::debug!(source = source.name(), "Collector stopped");
}

/// Resolves once shutdown is signalled
///
/// The `watch::Ref` from `wait_for` is dropped here, so callers never hold it
/// across an await.
pub(crate) async fn shutdown_signalled(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|&v| v).await;
}

/// Push a snapshot into the channel, blocking while it is full
///
/// Returns `false` when shutdown fired or the channel closed mid-snapshot.
pub(crate) async fn push_all(
    tx: &mpsc::Sender<Metric>,
    metrics: Vec<Metric>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> bool {
    for metric in metrics {
        tokio::select! {
            biased;
            _ = shutdown_signalled(shutdown_rx) => return false,
            sent = tx.send(metric) => {
                if sent.is_err() {
                    return false;
                }
            }
        }
    }
    true
}

#[derive(Clone)]
enum Delivery {
    Direct(Arc<dyn MetricSender>),
    Accumulate(Arc<MetricAccumulator>),
}

impl Delivery {
    async fn deliver(&self, metric: Metric) {
        match self {
            Delivery::Direct(sender) => {
                if let Err(e) = sender.send(&metric).await {
                    tracing::warn!(metric_id = metric.id(), error = %e, "Delivery failed, dropping metric");
                }
            }
            Delivery::Accumulate(accumulator) => {
                let id = metric.id().to_string();
                if let Err(e) = accumulator.record(metric) {
                    tracing::warn!(metric_id = %id, error = %e, "Could not accumulate metric");
                }
            }
        }
    }
}

async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Metric>>>,
    delivery: Delivery,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut draining = false;
    loop {
        let next = if draining {
            rx.lock().await.recv().await
        } else {
            tokio::select! {
                _ = shutdown_signalled(&mut shutdown_rx) => {
                    draining = true;
                    continue;
                }
                next = async { rx.lock().await.recv().await } => next,
            }
        };

        match next {
            Some(metric) => delivery.deliver(metric).await,
            None => break,
        }
    }
    tracing::debug!(worker_id, "Worker stopped");
}

async fn run_reporter(
    accumulator: Arc<MetricAccumulator>,
    sender: Arc<dyn MetricSender>,
    report_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + report_interval, report_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_signalled(&mut shutdown_rx) => break,
            _ = ticker.tick() => flush_batch(&accumulator, sender.as_ref()).await,
        }
    }
}

async fn flush_batch(accumulator: &MetricAccumulator, sender: &dyn MetricSender) {
    let batch = accumulator.drain();
    if batch.is_empty() {
        return;
    }
    if let Err(e) = sender.send_batch(&batch).await {
        tracing::warn!(count = batch.len(), error = %e, "Batch delivery failed, dropping batch");
    }
}
