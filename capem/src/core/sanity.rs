//! Post bring-up sanity checks against node status variables

use regex::Regex;
use shared::{cluster_error, cluster_info, LogScope};
use std::sync::Arc;

use super::node::Node;
use crate::error::{ClusterError, ClusterResult};
use crate::traits::SqlProbe;

/// One status variable and the pattern its value must match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityCheck {
    pub variable: String,
    pub pattern: String,
}

impl SanityCheck {
    pub fn new(variable: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            pattern: pattern.into(),
        }
    }

    /// Replication health checks run after every bring-up
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("wsrep_cluster_status", "Primary"),
            Self::new("wsrep_local_state_comment", "Synced|Donor"),
            Self::new("wsrep_local_recv_queue", "0"),
            Self::new("wsrep_local_send_queue", "0"),
        ]
    }

    pub fn query(&self) -> String {
        format!("show global status like '{}'", self.variable)
    }
}

/// Runs every check against every active node
pub struct SanityChecker {
    sql: Arc<dyn SqlProbe>,
    checks: Vec<(SanityCheck, Regex)>,
}

impl std::fmt::Debug for SanityChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanityChecker")
            .field("checks", &self.checks)
            .finish_non_exhaustive()
    }
}

impl SanityChecker {
    /// Compile the checks; a pattern matches only the whole observed value
    pub fn new(sql: Arc<dyn SqlProbe>, checks: Vec<SanityCheck>) -> ClusterResult<Self> {
        let checks = checks
            .into_iter()
            .map(|check| {
                let regex = Regex::new(&format!("^(?:{})$", check.pattern))
                    .map_err(|e| ClusterError::config("sanity pattern", format!("{}: {e}", check.pattern)))?;
                Ok((check, regex))
            })
            .collect::<ClusterResult<Vec<_>>>()?;

        Ok(Self { sql, checks })
    }

    /// Fails on the first value that does not match; stopped nodes are skipped
    pub async fn verify(&self, nodes: &[Node]) -> ClusterResult<()> {
        let active = nodes
            .iter()
            .filter(|n| !n.is_stopped())
            .filter_map(|n| n.rendezvous().map(|socket| (n, socket)));

        for (node, socket) in active {
            let scope = LogScope::Node(node.name().to_string());

            for (check, regex) in &self.checks {
                let observed = self.sql.query(&check.query(), socket).await?;
                let observed = observed.trim();

                if !regex.is_match(observed) {
                    cluster_error!(scope, "❌ Mismatch {} {} on {}", check.pattern, observed, node.name());
                    return Err(ClusterError::SanityMismatch {
                        node: node.name().to_string(),
                        variable: check.variable.clone(),
                        expected: check.pattern.clone(),
                        actual: observed.to_string(),
                    });
                }
            }
            cluster_info!(scope, "🩺 {} passed {} sanity checks", node.name(), self.checks.len());
        }
        Ok(())
    }
}
