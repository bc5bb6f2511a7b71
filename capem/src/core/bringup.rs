//! Per-node bring-up: probe, bridge, hand off

use shared::{cluster_info, LogScope};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::node::Node;
use super::prober::ReadinessProber;
use super::proxy::SocketProxySpawner;
use super::registry::ReadyNode;
use crate::error::{ClusterError, ClusterResult};

/// Takes a started node to ready
///
/// Cheap to clone; joiners run a clone inside their own task.
#[derive(Clone)]
pub struct BringUp {
    prober: Arc<ReadinessProber>,
    spawner: Arc<SocketProxySpawner>,
}

impl BringUp {
    pub fn new(prober: Arc<ReadinessProber>, spawner: Arc<SocketProxySpawner>) -> Self {
        Self { prober, spawner }
    }

    /// Probe the node and start its bridge; returns the node in the ready state
    pub async fn run(&self, mut node: Node) -> ClusterResult<ReadyNode> {
        node.begin_probing()?;

        let endpoint = node.endpoint().cloned().ok_or_else(|| ClusterError::InspectFailed {
            name: node.name().to_string(),
            field: "published endpoint".to_string(),
            value: String::new(),
        })?;
        self.prober.probe(node.name(), &endpoint).await?;

        let proxy = self.spawner.spawn(&mut node).await?;
        node.mark_ready()?;

        cluster_info!(LogScope::Node(node.name().to_string()), "✅ {} is ready", node.name());
        Ok(ReadyNode { node, proxy })
    }

    /// Bring the node up and publish it on the ready channel
    pub async fn publish(&self, node: Node, ready_tx: mpsc::Sender<ReadyNode>) -> ClusterResult<()> {
        let name = node.name().to_string();
        let ready = self.run(node).await?;
        ready_tx
            .send(ready)
            .await
            .map_err(|_| ClusterError::ChannelClosed(format!("ready channel while publishing {name}")))
    }
}
