use clap::Parser;

use super::config::StorageBackend;
use super::constants::{
    ENV_ADDRESS, ENV_DATABASE_DSN, ENV_DB_RETRY_ATTEMPTS, ENV_DB_RETRY_DELAY,
    ENV_FILE_STORAGE_PATH, ENV_KEY, ENV_RESTORE, ENV_STORAGE_BACKEND, ENV_STORE_INTERVAL,
};

#[derive(Parser)]
#[command(name = "osmetrics-server")]
#[command(version, about = "Metrics collection server", long_about = None)]
pub struct Cli {
    /// Listen address (host:port)
    #[arg(long, short = 'a', env = ENV_ADDRESS)]
    pub address: Option<String>,

    /// Snapshot flush interval in seconds (0 = write-through)
    #[arg(long, short = 'i', env = ENV_STORE_INTERVAL)]
    pub interval: Option<u64>,

    /// Snapshot file path (empty disables file storage)
    #[arg(long, short = 'f', env = ENV_FILE_STORAGE_PATH)]
    pub path: Option<String>,

    /// Load the snapshot on startup
    #[arg(long, short = 'r', env = ENV_RESTORE)]
    pub restore: Option<bool>,

    /// Database DSN (postgres://... or sqlite:...)
    #[arg(long, short = 'd', env = ENV_DATABASE_DSN)]
    pub database: Option<String>,

    /// Storage backend (memory, file or database); inferred when unset
    #[arg(long, env = ENV_STORAGE_BACKEND, value_parser = parse_storage_backend)]
    pub storage: Option<StorageBackend>,

    /// Database connection attempts
    #[arg(long, env = ENV_DB_RETRY_ATTEMPTS)]
    pub db_retry_attempts: Option<u32>,

    /// Seconds between database connection attempts
    #[arg(long, env = ENV_DB_RETRY_DELAY)]
    pub db_retry_delay: Option<u64>,

    /// Shared secret for request signature checks
    #[arg(long, short = 'k', env = ENV_KEY)]
    pub key: Option<String>,
}

/// Parse storage backend from CLI/env string
fn parse_storage_backend(s: &str) -> Result<StorageBackend, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "file" => Ok(StorageBackend::File),
        "database" | "db" => Ok(StorageBackend::Database),
        _ => Err(format!(
            "Invalid storage backend '{}'. Valid options: memory, file, database",
            s
        )),
    }
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub address: Option<String>,
    pub interval: Option<u64>,
    pub path: Option<String>,
    pub restore: Option<bool>,
    pub database: Option<String>,
    pub storage: Option<StorageBackend>,
    pub db_retry_attempts: Option<u32>,
    pub db_retry_delay: Option<u64>,
    pub key: Option<String>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            address: cli.address,
            interval: cli.interval,
            path: cli.path,
            restore: cli.restore,
            database: cli.database,
            storage: cli.storage,
            db_retry_attempts: cli.db_retry_attempts,
            db_retry_delay: cli.db_retry_delay,
            key: cli.key,
        }
    }
}

/// Parse CLI arguments
pub fn parse() -> CliConfig {
    Cli::parse().into()
}
