//! Node registry and the started/ready hand-off channels
//!
//! The registry is owned by the control task, which is its only writer:
//! bring-up tasks never touch it directly, they publish a [`ReadyNode`] on the
//! ready channel and the control task admits it. Every launched environment is
//! announced on the started channel so teardown can find it later.

use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::node::{Node, NodeRole, NodeState};
use super::supervisor::SupervisedProcess;
use crate::error::{ClusterError, ClusterResult};

/// An environment whose launch completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedEnvironment {
    pub name: String,
    pub role: NodeRole,
}

/// A node that passed readiness probing, together with its live proxy
#[derive(Debug)]
pub struct ReadyNode {
    pub node: Node,
    pub proxy: SupervisedProcess,
}

pub struct NodeRegistry {
    nodes: Vec<Node>,
    proxies: Vec<SupervisedProcess>,
    started_tx: Option<mpsc::Sender<StartedEnvironment>>,
    started_rx: mpsc::Receiver<StartedEnvironment>,
    ready_tx: mpsc::Sender<ReadyNode>,
    ready_rx: mpsc::Receiver<ReadyNode>,
}

impl NodeRegistry {
    /// Registry for `node_count` members plus one infrastructure slot
    pub fn new(node_count: usize) -> Self {
        let capacity = node_count + 1;
        let (started_tx, started_rx) = mpsc::channel(capacity);
        let (ready_tx, ready_rx) = mpsc::channel(capacity);

        Self {
            nodes: Vec::with_capacity(node_count),
            proxies: Vec::with_capacity(node_count),
            started_tx: Some(started_tx),
            started_rx,
            ready_tx,
            ready_rx,
        }
    }

    /// Sender handed to a bring-up task
    pub fn ready_sender(&self) -> mpsc::Sender<ReadyNode> {
        self.ready_tx.clone()
    }

    /// Announce an environment before it is launched, so teardown always stops it
    pub async fn record_started(&self, name: &str, role: NodeRole) -> ClusterResult<()> {
        let tx = self
            .started_tx
            .as_ref()
            .ok_or_else(|| ClusterError::ChannelClosed("started channel".to_string()))?;
        tx.send(StartedEnvironment {
            name: name.to_string(),
            role,
        })
        .await
        .map_err(|_| ClusterError::ChannelClosed("started channel".to_string()))
    }

    /// Next node published on the ready channel
    pub async fn recv_ready(&mut self) -> Option<ReadyNode> {
        self.ready_rx.recv().await
    }

    /// Add a ready node; each name is admitted at most once
    pub fn admit(&mut self, ready: ReadyNode) -> ClusterResult<()> {
        let ReadyNode { node, proxy } = ready;

        if self.nodes.iter().any(|n| n.name() == node.name()) {
            // The proxy handle is dropped here, which kills it
            return Err(ClusterError::DuplicateNode {
                name: node.name().to_string(),
            });
        }
        if node.state() != NodeState::Ready {
            return Err(ClusterError::InvalidTransition {
                name: node.name().to_string(),
                from: node.state(),
                to: NodeState::Ready,
            });
        }

        self.proxies.push(proxy);
        self.nodes.push(node);
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bootstrap(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.is_bootstrap())
    }

    pub fn proxies(&self) -> &[SupervisedProcess] {
        &self.proxies
    }

    /// Rendezvous paths of every node that has not been stopped
    pub fn active_rendezvous_paths(&self) -> Vec<PathBuf> {
        self.nodes
            .iter()
            .filter(|n| !n.is_stopped())
            .filter_map(|n| n.rendezvous().map(PathBuf::from))
            .collect()
    }

    /// Mark the node with sequence index `index` as stopped
    pub fn mark_stopped(&mut self, index: usize) -> ClusterResult<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.index() == index)
            .ok_or(ClusterError::UnknownNode { index })?;
        node.mark_stopped()
    }

    /// Names of nodes whose proxy went away on its own
    pub fn unexpected_proxy_exits(&self) -> Vec<String> {
        self.proxies
            .iter()
            .filter(|p| p.exited_unexpectedly())
            .map(|p| p.label().to_string())
            .collect()
    }

    /// Close the started channel and collect everything announced on it
    pub fn close_started(&mut self) -> Vec<StartedEnvironment> {
        self.started_tx = None;
        self.started_rx.close();

        let mut started = Vec::new();
        let mut seen = HashSet::new();
        while let Ok(env) = self.started_rx.try_recv() {
            if seen.insert(env.name.clone()) {
                started.push(env);
            }
        }
        started
    }

    /// Take every proxy, including ones published but never admitted
    pub fn take_proxies(&mut self) -> Vec<SupervisedProcess> {
        self.ready_rx.close();
        while let Ok(pending) = self.ready_rx.try_recv() {
            self.proxies.push(pending.proxy);
        }
        std::mem::take(&mut self.proxies)
    }
}
