//! Collaborator trait definitions with mockall annotations for testing
//!
//! The orchestrator only ever talks to the outside world through these traits:
//! the container runtime, the image builder, the readiness ping, the SQL client,
//! the workload generator, the traffic shaper and the background process launcher.
//! Real implementations live in [`crate::services`].

use shared::{Endpoint, NetDelay};
use std::fmt;
use std::path::Path;

use crate::core::launch::LaunchSpec;
use crate::core::supervisor::SupervisedProcess;
use crate::core::workload::WorkloadInvocation;
use crate::error::ClusterResult;

/// Introspection fields the environment runner must be able to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InspectField {
    /// Address assigned inside the isolated network
    IpAddress,
    /// Root process id of the environment
    Pid,
    /// Host port published for the node service port
    HostPort,
    /// Host address published for the node service port
    HostIp,
}

impl fmt::Display for InspectField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectField::IpAddress => write!(f, "ip address"),
            InspectField::Pid => write!(f, "pid"),
            InspectField::HostPort => write!(f, "host port"),
            InspectField::HostIp => write!(f, "host ip"),
        }
    }
}

/// Isolated execution environment runner
#[mockall::automock]
#[async_trait::async_trait]
pub trait EnvironmentRunner: Send + Sync {
    /// Launch a named environment; failure is fatal for the run
    async fn start(&self, name: &str, spec: &LaunchSpec) -> ClusterResult<()>;

    /// Read one introspection field of a running environment
    async fn inspect(&self, name: &str, field: InspectField) -> ClusterResult<String>;

    /// Stop a named environment
    async fn stop(&self, name: &str) -> ClusterResult<()>;

    /// Forcefully remove a named environment left over from a previous run
    async fn remove(&self, name: &str) -> ClusterResult<()>;
}

/// Runtime image preparation
#[mockall::automock]
#[async_trait::async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Download `url` to `local_path` unless the file is already present
    async fn ensure_artifact(&self, url: &str, local_path: &Path) -> ClusterResult<()>;

    /// Build the image `tag` from `Dockerfile.<variant>`
    async fn build(&self, variant: &str, tag: &str) -> ClusterResult<()>;
}

/// Single-shot connectivity check against a node endpoint
#[mockall::automock]
#[async_trait::async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Returns true once the node accepts client connections
    async fn ping(&self, endpoint: &Endpoint) -> bool;
}

/// SQL client used by data preparation and the sanity checks
#[mockall::automock]
#[async_trait::async_trait]
pub trait SqlProbe: Send + Sync {
    /// Run `sql` through the node's rendezvous path and return the last value printed
    async fn query(&self, sql: &str, socket: &Path) -> ClusterResult<String>;
}

/// External load generator, one blocking call per phase
#[mockall::automock]
#[async_trait::async_trait]
pub trait WorkloadGenerator: Send + Sync {
    async fn run(&self, invocation: &WorkloadInvocation) -> ClusterResult<()>;
}

/// Egress latency shaping inside a node's network namespace
#[mockall::automock]
#[async_trait::async_trait]
pub trait NetworkShaper: Send + Sync {
    async fn add_delay(&self, pid: u32, interface: &str, delay: NetDelay) -> ClusterResult<()>;
}

/// Launcher for long-lived background processes
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start `program` under supervision; the process is never awaited by the caller
    fn spawn(&self, label: &str, program: &str, args: &[String]) -> ClusterResult<SupervisedProcess>;

    /// Kill leftover processes whose command line matches `pattern`
    async fn kill_strays(&self, pattern: &str) -> usize;
}
