//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod shutdown;

pub use crate::app::ServerApp;
pub use cli::CliConfig;
pub use config::{ServerConfig, StorageBackend, StorageConfig};
pub use shutdown::ShutdownService;
