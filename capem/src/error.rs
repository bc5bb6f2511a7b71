//! Orchestrator-specific error types

use shared::SharedError;
use std::time::Duration;
use thiserror::Error;

use crate::core::node::NodeState;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Command failed: {message} (command: {command})")]
    CommandFailed {
        command: String,
        message: String,
        stderr: String,
    },

    #[error("Environment {name} failed to start: {reason}")]
    EnvironmentStartFailed { name: String, reason: String },

    #[error("Failed to inspect {field} of {name}: got '{value}'")]
    InspectFailed { name: String, field: String, value: String },

    #[error("Node {name} failed to come up after {attempts} attempts")]
    ReadinessExhausted { name: String, attempts: u32 },

    #[error("Failed to spawn proxy for {name}: {reason}")]
    ProxySpawnFailed { name: String, reason: String },

    #[error("Rendezvous path of {name} is already set")]
    RendezvousAlreadySet { name: String },

    #[error("Node {name} cannot move from {from} to {to}")]
    InvalidTransition { name: String, from: NodeState, to: NodeState },

    #[error("Node {name} is already registered")]
    DuplicateNode { name: String },

    #[error("No registered node with index {index}")]
    UnknownNode { index: usize },

    #[error("Sanity mismatch on {node}: {variable} expected '{expected}' got '{actual}'")]
    SanityMismatch {
        node: String,
        variable: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {field}: {reason}")]
    ConfigurationError { field: String, reason: String },

    #[error("Only {ready} of {expected} nodes became ready within {timeout:?}")]
    JoinTimeout {
        ready: usize,
        expected: usize,
        timeout: Duration,
    },

    #[error("Run exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Run interrupted: {0}")]
    Interrupted(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ClusterError {
    pub fn command(command: impl Into<String>, message: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
            stderr: stderr.into(),
        }
    }

    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;
