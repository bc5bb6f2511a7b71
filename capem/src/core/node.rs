//! Cluster member model and its lifecycle state machine

use serde::Serialize;
use shared::Endpoint;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ClusterError, ClusterResult};

/// Part a node plays in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Helper environment (name resolution), never probed or proxied
    Infrastructure,
    /// Starts a new cluster; exactly one per run
    Bootstrap,
    /// Attaches to the cluster started by the bootstrap node
    Joiner,
}

/// Lifecycle of a cluster member: `Started -> Probing -> Ready -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Started,
    Probing,
    Ready,
    Stopped,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Started => write!(f, "started"),
            NodeState::Probing => write!(f, "probing"),
            NodeState::Ready => write!(f, "ready"),
            NodeState::Stopped => write!(f, "stopped"),
        }
    }
}

/// One cluster member
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    index: usize,
    role: NodeRole,
    ip_address: String,
    pid: Option<u32>,
    endpoint: Option<Endpoint>,
    rendezvous: Option<PathBuf>,
    state: NodeState,
}

impl Node {
    /// Node whose environment has just been launched
    pub fn started(name: impl Into<String>, index: usize, role: NodeRole, ip_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index,
            role,
            ip_address: ip_address.into(),
            pid: None,
            endpoint: None,
            rendezvous: None,
            state: NodeState::Started,
        }
    }

    /// Attach the process id and the host-reachable endpoint
    pub fn with_process(mut self, pid: u32, endpoint: Endpoint) -> Self {
        self.pid = Some(pid);
        self.endpoint = Some(endpoint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn is_bootstrap(&self) -> bool {
        self.role == NodeRole::Bootstrap
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn rendezvous(&self) -> Option<&Path> {
        self.rendezvous.as_deref()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == NodeState::Stopped
    }

    /// Record the proxy's rendezvous path; it can only be set once
    pub fn set_rendezvous(&mut self, path: PathBuf) -> ClusterResult<()> {
        if self.rendezvous.is_some() {
            return Err(ClusterError::RendezvousAlreadySet {
                name: self.name.clone(),
            });
        }
        self.rendezvous = Some(path);
        Ok(())
    }

    pub fn begin_probing(&mut self) -> ClusterResult<()> {
        self.transition(NodeState::Started, NodeState::Probing)
    }

    /// Ready requires a live rendezvous path
    pub fn mark_ready(&mut self) -> ClusterResult<()> {
        if self.rendezvous.is_none() {
            return Err(self.invalid(NodeState::Ready));
        }
        self.transition(NodeState::Probing, NodeState::Ready)
    }

    /// Stopped is terminal; stopping twice is a no-op
    pub fn mark_stopped(&mut self) -> ClusterResult<()> {
        match self.state {
            NodeState::Stopped => Ok(()),
            _ => self.transition(NodeState::Ready, NodeState::Stopped),
        }
    }

    fn transition(&mut self, from: NodeState, to: NodeState) -> ClusterResult<()> {
        if self.state != from {
            return Err(self.invalid(to));
        }
        self.state = to;
        Ok(())
    }

    fn invalid(&self, to: NodeState) -> ClusterError {
        ClusterError::InvalidTransition {
            name: self.name.clone(),
            from: self.state,
            to,
        }
    }
}
