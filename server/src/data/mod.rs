//! Data storage layer
//!
//! - `memory` - In-process map, lost on restart
//! - `file` - In-memory map persisted as a JSON snapshot
//! - `sqlite` / `postgres` - Relational stores selected by DSN
//! - `traits` - The [`MetricStore`] trait every backend implements
//! - `error` - Unified error type for all backends

pub mod error;
pub mod file;
pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod traits;

pub use error::DataError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
pub use traits::MetricStore;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::config::StorageConfig;

/// Storage service enum
///
/// Wraps the backend chosen at startup. Services are stored as Arc so the
/// request path and background tasks can share them.
pub enum StorageService {
    Memory(Arc<MemoryStore>),
    File(Arc<FileStore>),
    Sqlite(Arc<SqliteStore>),
    Postgres(Arc<PostgresStore>),
}

impl StorageService {
    /// Initialize the backend described by `config`
    ///
    /// A database DSN starting with `sqlite:` selects SQLite; any other DSN
    /// is handed to PostgreSQL.
    pub async fn init(config: &StorageConfig) -> Result<Self, DataError> {
        let service = match config {
            StorageConfig::Memory => Self::Memory(Arc::new(MemoryStore::new())),
            StorageConfig::File(file) => Self::File(Arc::new(FileStore::open(file).await?)),
            StorageConfig::Database(db) if is_sqlite_dsn(&db.dsn) => {
                Self::Sqlite(Arc::new(SqliteStore::connect(db).await?))
            }
            StorageConfig::Database(db) => {
                Self::Postgres(Arc::new(PostgresStore::connect(db).await?))
            }
        };
        tracing::debug!(backend = service.backend_name(), "Storage initialized");
        Ok(service)
    }

    /// Trait object for request handlers
    pub fn store(&self) -> Arc<dyn MetricStore> {
        match self {
            Self::Memory(s) => Arc::clone(s) as Arc<dyn MetricStore>,
            Self::File(s) => Arc::clone(s) as Arc<dyn MetricStore>,
            Self::Sqlite(s) => Arc::clone(s) as Arc<dyn MetricStore>,
            Self::Postgres(s) => Arc::clone(s) as Arc<dyn MetricStore>,
        }
    }

    /// Start the periodic snapshot task (file store in interval mode only)
    pub fn start_background_task(
        &self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        match self {
            Self::File(s) => s.start_flush_task(shutdown_rx),
            _ => None,
        }
    }

    /// Flush and release the backend
    pub async fn close(&self) -> Result<(), DataError> {
        self.store().close().await
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(s) => s.backend_name(),
            Self::File(s) => s.backend_name(),
            Self::Sqlite(s) => s.backend_name(),
            Self::Postgres(s) => s.backend_name(),
        }
    }
}

fn is_sqlite_dsn(dsn: &str) -> bool {
    dsn.starts_with("sqlite:")
}
