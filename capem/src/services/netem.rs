//! Egress delay through `tc netem`, entered via the node's network namespace

use async_trait::async_trait;
use shared::NetDelay;

use super::shell::ShellRunner;
use crate::error::ClusterResult;
use crate::traits::NetworkShaper;

#[derive(Debug, Clone, Default)]
pub struct NetemShaper {
    shell: ShellRunner,
}

impl NetemShaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two `tc` invocations: a prio root qdisc, then netem on its second band
    pub fn commands(pid: u32, interface: &str, delay: NetDelay) -> [String; 2] {
        [
            format!("sudo nsenter -t {pid} -n tc qdisc replace dev {interface} root handle 1: prio"),
            format!("sudo nsenter -t {pid} -n tc qdisc add dev {interface} parent 1:2 handle 30: netem delay {delay}"),
        ]
    }
}

#[async_trait]
impl NetworkShaper for NetemShaper {
    async fn add_delay(&self, pid: u32, interface: &str, delay: NetDelay) -> ClusterResult<()> {
        let [replace, attach] = Self::commands(pid, interface, delay);

        self.shell
            .script(&replace, &format!("Failed to replace dev for pid {pid}"))
            .await?;
        self.shell
            .script(&attach, &format!("Failed to attach delay for pid {pid}"))
            .await?;
        Ok(())
    }
}
