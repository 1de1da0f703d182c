//! Metric wire model and request signing, plus the push agent behind the
//! default `agent` feature

#[cfg(feature = "agent")]
pub mod app;
pub mod core;
pub mod model;
#[cfg(feature = "agent")]
pub mod pipeline;
#[cfg(feature = "agent")]
pub mod sender;
pub mod signing;
#[cfg(feature = "agent")]
pub mod source;
