use std::time::Duration;

use anyhow::Result;

use crate::pipeline::{DeliveryMode, PipelineSettings, ReadinessPolicy};

use super::cli::CliConfig;
use super::constants::{
    DEFAULT_ADDRESS, DEFAULT_CHANNEL_SIZE, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RATE_LIMIT,
    DEFAULT_REPORT_INTERVAL_SECS, READY_BASE_DELAY_SECS, READY_DELAY_STEP_SECS,
    READY_MAX_DELAY_SECS,
};

/// Final merged agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub address: String,
    pub poll_interval: Duration,
    pub report_interval: Duration,
    pub rate_limit: usize,
    pub channel_size: usize,
    pub delivery: DeliveryMode,
    pub key: Option<String>,
    pub readiness: ReadinessPolicy,
}

impl AgentConfig {
    /// Load configuration
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading agent configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let address = cli
            .address
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let poll_secs = cli.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if poll_secs == 0 {
            anyhow::bail!("Poll interval must be at least 1 second");
        }

        let report_secs = cli
            .report_interval
            .unwrap_or(DEFAULT_REPORT_INTERVAL_SECS);
        if report_secs == 0 {
            anyhow::bail!("Report interval must be at least 1 second");
        }

        let channel_size = cli.channel_size.unwrap_or(DEFAULT_CHANNEL_SIZE);
        if channel_size == 0 {
            anyhow::bail!("Channel size must be at least 1");
        }

        let readiness = ReadinessPolicy {
            base_delay: Duration::from_secs(cli.ready_base_delay.unwrap_or(READY_BASE_DELAY_SECS)),
            delay_step: Duration::from_secs(cli.ready_delay_step.unwrap_or(READY_DELAY_STEP_SECS)),
            max_delay: Duration::from_secs(cli.ready_max_delay.unwrap_or(READY_MAX_DELAY_SECS)),
        };
        if readiness.delay_step.is_zero() {
            anyhow::bail!("Readiness delay step must be at least 1 second");
        }

        // Empty key disables signing
        let key = cli.key.clone().filter(|k| !k.is_empty());

        let config = Self {
            address,
            poll_interval: Duration::from_secs(poll_secs),
            report_interval: Duration::from_secs(report_secs),
            rate_limit: cli.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT),
            channel_size,
            delivery: cli.delivery.unwrap_or_default(),
            key,
            readiness,
        };
        tracing::debug!(config = ?config.redacted(), "Agent configuration loaded");
        Ok(config)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            poll_interval: self.poll_interval,
            report_interval: self.report_interval,
            channel_size: self.channel_size,
            workers: self.rate_limit,
            delivery: self.delivery,
            readiness: self.readiness,
        }
    }

    fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.key.is_some() {
            copy.key = Some("***".to_string());
        }
        copy
    }
}
