use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, DEFAULT_ADDRESS, DEFAULT_DB_RETRY_ATTEMPTS, DEFAULT_DB_RETRY_DELAY_SECS,
    DEFAULT_FILE_NAME, DEFAULT_RESTORE, DEFAULT_STORE_INTERVAL_SECS,
};
use crate::utils::file::expand_path;

/// Storage backend requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File,
    Database,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Database => write!(f, "database"),
        }
    }
}

/// Snapshot file settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfig {
    pub path: PathBuf,
    /// Zero means flush after every save
    pub store_interval: Duration,
    pub restore: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub dsn: String,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

// DSN may carry a password
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("dsn", &"***")
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

/// Resolved storage selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    File(FileConfig),
    Database(DatabaseConfig),
}

impl StorageConfig {
    pub fn backend(&self) -> StorageBackend {
        match self {
            StorageConfig::Memory => StorageBackend::Memory,
            StorageConfig::File(_) => StorageBackend::File,
            StorageConfig::Database(_) => StorageBackend::Database,
        }
    }
}

/// Final merged server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub storage: StorageConfig,
    pub key: Option<String>,
}

impl ServerConfig {
    /// Load configuration
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. CLI arguments (which include env var fallbacks via clap)
    ///
    /// Without an explicit backend, a DSN selects the database, then a
    /// non-empty snapshot path selects the file store, then memory.
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading server configuration");

        let address = cli
            .address
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let dsn = cli
            .database
            .clone()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let path = match &cli.path {
            Some(p) if p.trim().is_empty() => None,
            Some(p) => Some(expand_path(p)),
            None => Some(default_file_path()),
        };

        let backend = cli.storage.unwrap_or(if dsn.is_some() {
            StorageBackend::Database
        } else if path.is_some() {
            StorageBackend::File
        } else {
            StorageBackend::Memory
        });

        let storage = match backend {
            StorageBackend::Memory => StorageConfig::Memory,
            StorageBackend::File => {
                let Some(path) = path else {
                    anyhow::bail!("File storage requires a snapshot path");
                };
                StorageConfig::File(FileConfig {
                    path,
                    store_interval: Duration::from_secs(
                        cli.interval.unwrap_or(DEFAULT_STORE_INTERVAL_SECS),
                    ),
                    restore: cli.restore.unwrap_or(DEFAULT_RESTORE),
                })
            }
            StorageBackend::Database => {
                let Some(dsn) = dsn else {
                    anyhow::bail!("Database storage requires a DSN");
                };
                StorageConfig::Database(DatabaseConfig {
                    dsn,
                    retry_attempts: cli.db_retry_attempts.unwrap_or(DEFAULT_DB_RETRY_ATTEMPTS),
                    retry_delay: Duration::from_secs(
                        cli.db_retry_delay.unwrap_or(DEFAULT_DB_RETRY_DELAY_SECS),
                    ),
                })
            }
        };

        // Empty key disables signature checks
        let key = cli.key.clone().filter(|k| !k.is_empty());

        let config = Self {
            address,
            storage,
            key,
        };
        tracing::debug!(
            address = %config.address,
            storage = %config.storage.backend(),
            signed = config.key.is_some(),
            "Server configuration loaded"
        );
        Ok(config)
    }
}

fn default_file_path() -> PathBuf {
    expand_path(&format!("~/{}/{}", APP_DOT_FOLDER, DEFAULT_FILE_NAME))
}
