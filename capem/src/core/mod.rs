//! Core cluster lifecycle logic
//!
//! Everything here talks to the outside world only through the traits in
//! [`crate::traits`], so each piece can be driven by mocks.

pub mod bringup;
pub mod fault;
pub mod launch;
pub mod node;
pub mod prober;
pub mod proxy;
pub mod reaper;
pub mod registry;
pub mod sanity;
pub mod supervisor;
pub mod workload;

pub use bringup::BringUp;
pub use fault::{plan_stop_targets, FaultInjector, FaultKind, InjectionEvent, StopTarget};
pub use launch::LaunchSpec;
pub use node::{Node, NodeRole, NodeState};
pub use prober::{ReadinessProber, RetryPolicy};
pub use proxy::{ProxyCommand, SocketProxySpawner};
pub use reaper::{Reaper, TeardownReport};
pub use registry::{NodeRegistry, ReadyNode, StartedEnvironment};
pub use sanity::{SanityCheck, SanityChecker};
pub use supervisor::{ProcessExit, SupervisedProcess};
pub use workload::{WorkloadInvocation, WorkloadPhase, WorkloadSettings};
