//! Startup readiness gate
//!
//! Polls the collector's health endpoint with linear backoff: the delay
//! starts at `base_delay` and grows by `delay_step` after every failed probe.
//! Polling gives up once the next delay would exceed `max_delay`, so the
//! attempt budget is fixed by the policy alone.

use std::time::Duration;

use tokio::sync::watch;

use super::error::AgentError;
use super::shutdown_signalled;
use crate::core::constants::{READY_BASE_DELAY_SECS, READY_DELAY_STEP_SECS, READY_MAX_DELAY_SECS};
use crate::sender::HealthProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub base_delay: Duration,
    pub delay_step: Duration,
    pub max_delay: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(READY_BASE_DELAY_SECS),
            delay_step: Duration::from_secs(READY_DELAY_STEP_SECS),
            max_delay: Duration::from_secs(READY_MAX_DELAY_SECS),
        }
    }
}

impl ReadinessPolicy {
    /// Sleep after each failed attempt, in order
    ///
    /// The length of the schedule is the attempt budget. A zero step yields a
    /// single attempt.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut delays = vec![self.base_delay];
        if self.delay_step.is_zero() {
            return delays;
        }
        let mut delay = self.base_delay + self.delay_step;
        while delay <= self.max_delay {
            delays.push(delay);
            delay += self.delay_step;
        }
        delays
    }

    pub fn max_attempts(&self) -> u32 {
        self.schedule().len() as u32
    }
}

/// Block until the probe succeeds, the budget runs out, or shutdown fires
pub async fn wait_until_ready(
    probe: &dyn HealthProbe,
    policy: &ReadinessPolicy,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), AgentError> {
    let mut attempts = 0u32;

    for delay in policy.schedule() {
        attempts += 1;
        match probe.probe().await {
            Ok(()) => {
                tracing::info!(attempts, "Server is ready");
                return Ok(());
            }
            Err(e) => {
                tracing::info!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Server not ready, waiting"
                );
            }
        }

        tokio::select! {
            biased;
            _ = shutdown_signalled(shutdown_rx) => return Err(AgentError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::error!(attempts, "Server didn't become ready");
    Err(AgentError::ServerUnavailable { attempts })
}
