//! Fault Injection Engine
//!
//! Two independent behaviours: uniform egress latency on every node, and
//! stopping a random subset of non-bootstrap nodes while a benchmark runs.
//! The injector never writes to the node registry; it reports which nodes it
//! stopped and the control task applies that.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use shared::{cluster_error, cluster_info, cluster_warn, LogScope, NetDelay};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::node::Node;
use crate::error::ClusterResult;
use crate::traits::{EnvironmentRunner, NetworkShaper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Latency,
    StopNode,
}

#[derive(Debug, Clone, Serialize)]
pub struct InjectionEvent {
    pub timestamp: DateTime<Utc>,
    pub fault_type: FaultKind,
    pub target: String,
    pub success: bool,
    pub details: String,
}

/// Node picked for stopping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTarget {
    pub index: usize,
    pub name: String,
}

/// Pick the nodes to stop
///
/// Walks a random permutation of the nodes, skipping the bootstrap node and
/// nodes already stopped, and takes at most `floor(N / 2)` of them where N is
/// the number of nodes in the cluster.
pub fn plan_stop_targets<R: Rng + ?Sized>(nodes: &[Node], rng: &mut R) -> Vec<StopTarget> {
    let budget = nodes.len() / 2;

    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.shuffle(rng);

    order
        .into_iter()
        .filter_map(|position| nodes.get(position))
        .filter(|node| !node.is_bootstrap() && !node.is_stopped())
        .take(budget)
        .map(|node| StopTarget {
            index: node.index(),
            name: node.name().to_string(),
        })
        .collect()
}

pub struct FaultInjector {
    environment: Arc<dyn EnvironmentRunner>,
    shaper: Arc<dyn NetworkShaper>,
    injection_log: Vec<InjectionEvent>,
}

impl FaultInjector {
    pub fn new(environment: Arc<dyn EnvironmentRunner>, shaper: Arc<dyn NetworkShaper>) -> Self {
        Self {
            environment,
            shaper,
            injection_log: Vec::new(),
        }
    }

    /// Add `delay` to the egress of every node's `interface`
    ///
    /// Not reversed within a run; a failure on any node is fatal.
    pub async fn apply_latency(&mut self, nodes: &[Node], interface: &str, delay: NetDelay) -> ClusterResult<()> {
        for node in nodes {
            let Some(pid) = node.pid() else {
                cluster_warn!(LogScope::Fault, "⚠️ {} has no known pid, skipping latency", node.name());
                continue;
            };

            match self.shaper.add_delay(pid, interface, delay).await {
                Ok(()) => {
                    cluster_info!(LogScope::Fault, "🐢 Added {} delay on {} of {}", delay, interface, node.name());
                    self.log_injection(FaultKind::Latency, node.name(), true, &format!("{delay} on {interface}"));
                }
                Err(e) => {
                    cluster_error!(LogScope::Fault, "❌ Failed to attach delay for {}: {}", node.name(), e);
                    self.log_injection(FaultKind::Latency, node.name(), false, &e.to_string());
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Stop each target after `after`; returns the indices actually stopped
    ///
    /// A failed stop is logged and skipped, the node stays active.
    pub async fn stop_nodes(&mut self, targets: Vec<StopTarget>, after: Duration) -> Vec<usize> {
        if targets.is_empty() {
            cluster_info!(LogScope::Fault, "💤 No nodes eligible for stopping");
            return Vec::new();
        }

        sleep(after).await;

        let mut stopped = Vec::with_capacity(targets.len());
        for target in targets {
            cluster_warn!(LogScope::Fault, "💀 Stopping node {}", target.name);
            match self.environment.stop(&target.name).await {
                Ok(()) => {
                    self.log_injection(FaultKind::StopNode, &target.name, true, "environment stopped");
                    stopped.push(target.index);
                }
                Err(e) => {
                    cluster_error!(LogScope::Fault, "❌ Unable to stop node {}: {}", target.name, e);
                    self.log_injection(FaultKind::StopNode, &target.name, false, &e.to_string());
                }
            }
        }
        stopped
    }

    fn log_injection(&mut self, fault_type: FaultKind, target: &str, success: bool, details: &str) {
        self.injection_log.push(InjectionEvent {
            timestamp: Utc::now(),
            fault_type,
            target: target.to_string(),
            success,
            details: details.to_string(),
        });
    }

    pub fn injection_log(&self) -> &[InjectionEvent] {
        &self.injection_log
    }
}
