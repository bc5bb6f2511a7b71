//! Shared error types for the cluster orchestrator

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid delay value: {input}")]
    InvalidDelay { input: String },

    #[error("Invalid endpoint: {input}")]
    InvalidEndpoint { input: String },
}
