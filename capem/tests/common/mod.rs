//! Common test utilities and infrastructure
//!
//! Recording fakes for every collaborator, shared fixtures, and a builder
//! that wires them into a [`capem::ClusterOrchestrator`].

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fakes::EventLog;
pub use fixtures::TestFixtures;
pub use helpers::{ClusterHarness, TestHelpers};
