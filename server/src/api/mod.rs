//! API server and routes

pub mod extractors;
pub mod middleware;
pub mod routes;
mod server;
pub mod types;

use std::sync::Arc;

use crate::data::MetricStore;

pub use server::{ApiServer, router};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetricStore>,
}
