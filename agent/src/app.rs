//! Agent application

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::core::cli;
use crate::core::config::AgentConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG, HTTP_REQUEST_TIMEOUT_SECS};
use crate::core::shutdown::ShutdownService;
use crate::pipeline::AgentPipeline;
use crate::sender::HttpSender;
use crate::sender::transform::{GzipCompressor, HmacSigner};
use crate::source;

pub struct AgentApp {
    pub shutdown: ShutdownService,
    pub config: AgentConfig,
    pub sender: Arc<HttpSender>,
}

impl AgentApp {
    /// Run the agent with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Agent starting");

        let cli_config = cli::parse();
        let app = Self::init(AgentConfig::load(&cli_config)?)?;
        app.start().await
    }

    pub fn init(config: AgentConfig) -> Result<Self> {
        let mut sender = HttpSender::new(
            &config.address,
            Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
        )
        .context("Failed to build HTTP client")?;

        // Signature covers the uncompressed body
        if let Some(key) = &config.key {
            sender = sender.with_transform(HmacSigner::new(key));
        }
        sender = sender.with_transform(GzipCompressor::default());

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            sender: Arc::new(sender),
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start(self) -> Result<()> {
        // Install signal handlers before waiting on the server
        self.shutdown.install_signal_handlers();

        tracing::info!(
            server = self.sender.base_url(),
            poll_interval_secs = self.config.poll_interval.as_secs(),
            report_interval_secs = self.config.report_interval.as_secs(),
            workers = self.config.rate_limit,
            delivery = %self.config.delivery,
            signed = self.config.key.is_some(),
            "Agent started"
        );

        let pipeline = AgentPipeline::new(
            self.config.pipeline_settings(),
            source::default_sources(),
            self.sender.clone(),
            self.sender.clone(),
        );
        pipeline.run(self.shutdown.subscribe()).await?;

        tracing::info!("Agent stopped");
        Ok(())
    }
}
