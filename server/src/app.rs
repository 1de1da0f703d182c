//! Server application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{ApiServer, AppState};
use crate::core::cli::{self, CliConfig};
use crate::core::config::{ServerConfig, StorageConfig};
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::StorageService;

pub struct ServerApp {
    pub shutdown: ShutdownService,
    pub config: ServerConfig,
    pub storage: Arc<StorageService>,
}

impl ServerApp {
    /// Run the server with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Server starting");

        let cli_config = cli::parse();
        let app = Self::init(&cli_config).await?;
        app.start_server().await
    }

    pub async fn init(cli: &CliConfig) -> Result<Self> {
        let config = ServerConfig::load(cli)?;

        let backend = config.storage.backend();
        let storage = Arc::new(
            StorageService::init(&config.storage)
                .await
                .with_context(|| format!("Failed to initialize {} storage", backend))?,
        );
        if let StorageConfig::File(file) = &config.storage {
            tracing::info!(
                path = %file.path.display(),
                store_interval_secs = file.store_interval.as_secs(),
                "Using file storage"
            );
        }

        Ok(Self {
            shutdown: ShutdownService::new(storage.clone()),
            config,
            storage,
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

    async fn start_server(self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        self.shutdown.install_signal_handlers();

        self.start_background_tasks().await;

        tracing::info!(
            storage = self.storage.backend_name(),
            signed = self.config.key.is_some(),
            "Server started"
        );

        let server = ApiServer::new(
            self.config.address.clone(),
            AppState {
                store: self.storage.store(),
            },
            self.config.key.as_deref(),
            self.shutdown.clone(),
        );
        let result = server.start().await;

        // Storage is closed (and the final snapshot written) even if serving failed
        self.shutdown.shutdown().await;
        result
    }

    pub async fn start_background_tasks(&self) {
        if let Some(handle) = self
            .storage
            .start_background_task(self.shutdown.subscribe())
        {
            self.shutdown.register(handle).await;
        }
    }
}
