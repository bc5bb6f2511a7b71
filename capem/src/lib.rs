//! Cluster lifecycle and fault-injection orchestrator
//!
//! Brings up a database cluster in containers (a name-resolution helper, one
//! bootstrap node and its joiners), bridges every node to a local socket,
//! checks cluster health, benchmarks it, stops nodes while a benchmark runs,
//! and always tears down what it started.

pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{ClusterConfig, FaultSettings};
pub use core::{Node, NodeRole, NodeState, SanityCheck, TeardownReport, WorkloadSettings};
pub use error::{ClusterError, ClusterResult};
pub use orchestrator::{ClusterOrchestrator, ClusterServices, RunContext};
pub use report::RunReport;
pub use traits::{
    EnvironmentRunner, ImageBuilder, InspectField, NetworkShaper, ProcessLauncher, ReadinessCheck, SqlProbe,
    WorkloadGenerator,
};
