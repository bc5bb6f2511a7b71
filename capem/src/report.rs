//! JSON summary of a finished run

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::core::fault::InjectionEvent;
use crate::core::node::{Node, NodeRole, NodeState};
use crate::core::reaper::TeardownReport;
use crate::core::workload::WorkloadPhase;
use crate::error::ClusterResult;

/// One load generator call and how it went
#[derive(Debug, Clone, Serialize)]
pub struct PhaseRecord {
    #[serde(flatten)]
    pub phase: WorkloadPhase,
    pub sockets: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub index: usize,
    pub role: NodeRole,
    pub state: NodeState,
    pub ip_address: String,
    pub endpoint: Option<String>,
    pub rendezvous: Option<String>,
    pub stopped: bool,
}

impl From<&Node> for NodeSummary {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name().to_string(),
            index: node.index(),
            role: node.role(),
            state: node.state(),
            ip_address: node.ip_address().to_string(),
            endpoint: node.endpoint().map(ToString::to_string),
            rendezvous: node.rendezvous().map(|p| p.display().to_string()),
            stopped: node.is_stopped(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub platform: String,
    pub node_count: usize,
    pub outcome: String,
    pub nodes: Vec<NodeSummary>,
    pub phases: Vec<PhaseRecord>,
    pub injections: Vec<InjectionEvent>,
    pub teardown: Option<TeardownReport>,
}

impl RunReport {
    pub async fn write_to(&self, path: &Path) -> ClusterResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Endpoint;

    #[tokio::test]
    async fn test_report_is_written_as_json() {
        let node = Node::started("Dock1", 1, NodeRole::Bootstrap, "172.17.0.3").with_process(11, Endpoint::new("0.0.0.0", 32768));
        let now = Utc::now();
        let report = RunReport {
            platform: "centos7-64".to_string(),
            node_count: 1,
            outcome: "completed".to_string(),
            nodes: vec![NodeSummary::from(&node)],
            phases: vec![PhaseRecord {
                phase: WorkloadPhase::Benchmark { round: 1 },
                sockets: 1,
                started_at: now,
                finished_at: now,
                success: true,
            }],
            injections: Vec::new(),
            teardown: Some(TeardownReport::default()),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.write_to(&path).await.unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["nodes"][0]["name"], "Dock1");
        assert_eq!(value["nodes"][0]["role"], "bootstrap");
        assert_eq!(value["nodes"][0]["endpoint"], "0.0.0.0:32768");
        assert_eq!(value["phases"][0]["phase"], "benchmark");
        assert_eq!(value["phases"][0]["round"], 1);
    }
}
