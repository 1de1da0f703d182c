// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for log filters and identifiers)
pub const APP_NAME_LOWER: &str = "osmetrics";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".osmetrics-server";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "OSMETRICS_LOG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Listen address (`host:port`)
pub const ENV_ADDRESS: &str = "ADDRESS";

/// Shared secret for request signature checks
pub const ENV_KEY: &str = "KEY";

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Seconds between snapshot flushes (0 = write-through)
pub const ENV_STORE_INTERVAL: &str = "STORE_INTERVAL";

/// Snapshot file path
pub const ENV_FILE_STORAGE_PATH: &str = "FILE_STORAGE_PATH";

/// Load the snapshot on startup
pub const ENV_RESTORE: &str = "RESTORE";

/// Database DSN (`postgres://...` or `sqlite:...`)
pub const ENV_DATABASE_DSN: &str = "DATABASE_DSN";

/// Storage backend override (memory, file, database)
pub const ENV_STORAGE_BACKEND: &str = "STORAGE_BACKEND";

/// Database connection attempts
pub const ENV_DB_RETRY_ATTEMPTS: &str = "DB_RETRY_ATTEMPTS";

/// Seconds between database connection attempts
pub const ENV_DB_RETRY_DELAY: &str = "DB_RETRY_DELAY";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "localhost:8090";

/// Request body limit (batches included)
pub const DEFAULT_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Timeout for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Storage Defaults
// =============================================================================

/// Default snapshot flush interval
pub const DEFAULT_STORE_INTERVAL_SECS: u64 = 300;

/// Default snapshot file, relative to the home directory
pub const DEFAULT_FILE_NAME: &str = "metrics.json";

/// Restore the snapshot on startup unless told otherwise
pub const DEFAULT_RESTORE: bool = true;

/// Default database connection attempts
pub const DEFAULT_DB_RETRY_ATTEMPTS: u32 = 3;

/// Default delay between database connection attempts
pub const DEFAULT_DB_RETRY_DELAY_SECS: u64 = 2;

/// Bound on `SELECT 1` health checks
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// SQLite
// =============================================================================

pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// Busy timeout for lock contention between pooled connections
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// PostgreSQL
// =============================================================================

pub const POSTGRES_MAX_CONNECTIONS: u32 = 10;

pub const POSTGRES_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// HTTP Routes
// =============================================================================

pub const PATH_HEALTH: &str = "/health";
pub const PATH_PING: &str = "/ping";
pub const PATH_VALUE: &str = "/value";
pub const PATH_UPDATE: &str = "/update";
pub const PATH_UPDATES: &str = "/updates";
