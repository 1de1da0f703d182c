use thiserror::Error;

/// Errors that end an agent run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The readiness poll used up its attempt budget
    #[error("Server didn't become ready after {attempts} attempts")]
    ServerUnavailable { attempts: u32 },

    /// Shutdown was requested before the pipeline started
    #[error("Cancelled before the server became ready")]
    Cancelled,

    /// One or more pipeline tasks panicked
    #[error("{failed} pipeline task(s) did not exit cleanly")]
    TaskFailed { failed: usize },
}
