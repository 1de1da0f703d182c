#[cfg(feature = "agent")]
pub mod cli;
#[cfg(feature = "agent")]
pub mod config;
pub mod constants;
#[cfg(feature = "agent")]
pub mod shutdown;

#[cfg(feature = "agent")]
pub use config::AgentConfig;
#[cfg(feature = "agent")]
pub use shutdown::ShutdownService;
