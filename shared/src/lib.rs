//! Shared types for the capem cluster orchestrator
//!
//! Contains the value types and logging utilities used by every part of the
//! orchestrator: endpoints, latency values, log scopes and the shared error type.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
