use clap::Parser;

use crate::pipeline::DeliveryMode;

use super::constants::{
    ENV_ADDRESS, ENV_CHANNEL_SIZE, ENV_DELIVERY_MODE, ENV_KEY, ENV_POLL_INTERVAL,
    ENV_RATE_LIMIT, ENV_READY_BASE_DELAY, ENV_READY_DELAY_STEP, ENV_READY_MAX_DELAY,
    ENV_REPORT_INTERVAL,
};

#[derive(Parser)]
#[command(name = "osmetrics-agent")]
#[command(version, about = "Samples runtime and system metrics and pushes them to a collector", long_about = None)]
pub struct Cli {
    /// Collector address (host:port or base URL)
    #[arg(long, short = 'a', env = ENV_ADDRESS)]
    pub address: Option<String>,

    /// Seconds between samples
    #[arg(long, short = 'p', env = ENV_POLL_INTERVAL)]
    pub poll_interval: Option<u64>,

    /// Seconds between batch reports (batch delivery only)
    #[arg(long, short = 'r', env = ENV_REPORT_INTERVAL)]
    pub report_interval: Option<u64>,

    /// Number of concurrent delivery workers
    #[arg(long, short = 'l', env = ENV_RATE_LIMIT)]
    pub rate_limit: Option<usize>,

    /// Capacity of the metric channel
    #[arg(long, env = ENV_CHANNEL_SIZE)]
    pub channel_size: Option<usize>,

    /// Delivery mode (single or batch)
    #[arg(long, env = ENV_DELIVERY_MODE, value_parser = parse_delivery_mode)]
    pub delivery: Option<DeliveryMode>,

    /// Secret key used to sign request bodies
    #[arg(long, short = 'k', env = ENV_KEY)]
    pub key: Option<String>,

    /// Readiness poll: first delay in seconds
    #[arg(long, env = ENV_READY_BASE_DELAY)]
    pub ready_base_delay: Option<u64>,

    /// Readiness poll: delay increment in seconds
    #[arg(long, env = ENV_READY_DELAY_STEP)]
    pub ready_delay_step: Option<u64>,

    /// Readiness poll: maximum delay in seconds
    #[arg(long, env = ENV_READY_MAX_DELAY)]
    pub ready_max_delay: Option<u64>,
}

/// Parse delivery mode from CLI/env string
fn parse_delivery_mode(s: &str) -> Result<DeliveryMode, String> {
    match s.to_lowercase().as_str() {
        "single" => Ok(DeliveryMode::Single),
        "batch" => Ok(DeliveryMode::Batch),
        _ => Err(format!(
            "Invalid delivery mode '{}'. Valid options: single, batch",
            s
        )),
    }
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub address: Option<String>,
    pub poll_interval: Option<u64>,
    pub report_interval: Option<u64>,
    pub rate_limit: Option<usize>,
    pub channel_size: Option<usize>,
    pub delivery: Option<DeliveryMode>,
    pub key: Option<String>,
    pub ready_base_delay: Option<u64>,
    pub ready_delay_step: Option<u64>,
    pub ready_max_delay: Option<u64>,
}

/// Parse CLI arguments
pub fn parse() -> CliConfig {
    let cli = Cli::parse();
    CliConfig {
        address: cli.address,
        poll_interval: cli.poll_interval,
        report_interval: cli.report_interval,
        rate_limit: cli.rate_limit,
        channel_size: cli.channel_size,
        delivery: cli.delivery,
        key: cli.key,
        ready_base_delay: cli.ready_base_delay,
        ready_delay_step: cli.ready_delay_step,
        ready_max_delay: cli.ready_max_delay,
    }
}
