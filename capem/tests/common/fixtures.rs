//! Test fixtures and data for cluster run tests

use capem::{ClusterConfig, FaultSettings};
use shared::NetDelay;
use std::time::Duration;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const DEFAULT_NODE_COUNT: usize = 3;
    pub const INFRA_IP: &'static str = "172.17.0.2";
    pub const HOST_IP: &'static str = "127.0.0.1";
    pub const BASE_PORT: u16 = 32767;
    pub const BASE_PID: u32 = 4000;

    /// Sequence index of a node name, 0 for the infrastructure environment
    pub fn index_of(name: &str) -> usize {
        name.strip_prefix("Dock").and_then(|n| n.parse().ok()).unwrap_or(0)
    }

    pub fn ip_of(name: &str) -> String {
        format!("172.17.0.{}", Self::index_of(name) + 2)
    }

    pub fn pid_of(name: &str) -> u32 {
        Self::BASE_PID + Self::index_of(name) as u32
    }

    pub fn port_of(name: &str) -> u16 {
        Self::BASE_PORT + Self::index_of(name) as u16
    }

    /// Fast timings, latency on, faults off
    pub fn config(node_count: usize) -> ClusterConfig {
        ClusterConfig {
            node_count,
            probe_attempts: 3,
            probe_delay: Duration::from_millis(1),
            probe_max_delay: Duration::from_millis(4),
            proxy_timeout: Duration::from_secs(2),
            join_timeout: Duration::from_secs(10),
            run_deadline: Duration::from_secs(30),
            latency: Some(NetDelay::millis(3)),
            faults: None,
            ..Default::default()
        }
    }

    pub fn immediate_faults() -> FaultSettings {
        FaultSettings {
            stop_after: Duration::ZERO,
        }
    }
}
