// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for log filters and identifiers)
pub const APP_NAME_LOWER: &str = "osmetrics";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "OSMETRICS_LOG";

// =============================================================================
// Environment Variables - Agent
// =============================================================================

/// Collector address (`host:port` or full base URL)
pub const ENV_ADDRESS: &str = "ADDRESS";

/// Seconds between samples
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL";

/// Seconds between batch reports
pub const ENV_REPORT_INTERVAL: &str = "REPORT_INTERVAL";

/// Number of delivery workers
pub const ENV_RATE_LIMIT: &str = "RATE_LIMIT";

/// Capacity of the metric channel
pub const ENV_CHANNEL_SIZE: &str = "CHANNEL_SIZE";

/// Delivery mode (single or batch)
pub const ENV_DELIVERY_MODE: &str = "DELIVERY_MODE";

/// Shared secret for request signing
pub const ENV_KEY: &str = "KEY";

/// Readiness poll: initial delay in seconds
pub const ENV_READY_BASE_DELAY: &str = "READY_BASE_DELAY";

/// Readiness poll: delay increment in seconds
pub const ENV_READY_DELAY_STEP: &str = "READY_DELAY_STEP";

/// Readiness poll: maximum delay in seconds
pub const ENV_READY_MAX_DELAY: &str = "READY_MAX_DELAY";

// =============================================================================
// Agent Defaults
// =============================================================================

/// Default collector address
pub const DEFAULT_ADDRESS: &str = "localhost:8090";

/// Default poll interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Default report interval in seconds
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 10;

/// Default number of delivery workers
pub const DEFAULT_RATE_LIMIT: usize = 2;

/// Default metric channel capacity
pub const DEFAULT_CHANNEL_SIZE: usize = 100;

/// Per-request HTTP timeout in seconds
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// Readiness Poll
// =============================================================================

/// First delay after a failed health probe
pub const READY_BASE_DELAY_SECS: u64 = 1;

/// Added to the delay after each failed probe
pub const READY_DELAY_STEP_SECS: u64 = 2;

/// Polling stops once the next delay would exceed this
pub const READY_MAX_DELAY_SECS: u64 = 10;

// =============================================================================
// Wire Protocol
// =============================================================================

/// Header carrying the hex HMAC-SHA256 of the request body
pub const HASH_HEADER: &str = "HashSHA256";

/// Single-metric JSON update endpoint
pub const PATH_UPDATE: &str = "/update";

/// Batch JSON update endpoint
pub const PATH_UPDATES: &str = "/updates";

/// Liveness endpoint
pub const PATH_HEALTH: &str = "/health";
