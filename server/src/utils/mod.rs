//! Utility functions for the server

pub mod crypto;
pub mod file;
pub mod retry;
