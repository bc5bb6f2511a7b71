//! Socket proxy spawning
//!
//! Each ready node gets a long-lived bridge from a local unix socket (the
//! node's rendezvous path) to its published host:port. The bridge accepts any
//! number of concurrent clients and lives until teardown.

use shared::{cluster_debug, cluster_info, Endpoint, LogScope};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use super::node::Node;
use super::supervisor::SupervisedProcess;
use crate::error::{ClusterError, ClusterResult};
use crate::traits::ProcessLauncher;

const CONFIRM_POLL: Duration = Duration::from_millis(25);

/// Program and arguments of one bridge process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ProxyCommand {
    pub fn socat(rendezvous: &Path, endpoint: &Endpoint) -> Self {
        Self {
            program: "socat".to_string(),
            args: vec![
                format!("UNIX-LISTEN:{},fork,reuseaddr", rendezvous.display()),
                format!("TCP:{}:{}", endpoint.host, endpoint.port),
            ],
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct SocketProxySpawner {
    launcher: Arc<dyn ProcessLauncher>,
    job_dir: PathBuf,
    confirm_timeout: Duration,
}

impl SocketProxySpawner {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, job_dir: impl Into<PathBuf>, confirm_timeout: Duration) -> Self {
        Self {
            launcher,
            job_dir: job_dir.into(),
            confirm_timeout,
        }
    }

    pub fn rendezvous_path(&self, name: &str) -> PathBuf {
        self.job_dir.join(format!("{name}.sock"))
    }

    /// Start the bridge for `node` and record its rendezvous path
    ///
    /// The path is set only once the bridge has created it, so a node never
    /// advertises a socket nobody listens on.
    pub async fn spawn(&self, node: &mut Node) -> ClusterResult<SupervisedProcess> {
        let scope = LogScope::Proxy(node.name().to_string());

        if node.rendezvous().is_some() {
            return Err(ClusterError::RendezvousAlreadySet {
                name: node.name().to_string(),
            });
        }
        let endpoint = node.endpoint().cloned().ok_or_else(|| ClusterError::ProxySpawnFailed {
            name: node.name().to_string(),
            reason: "node has no published endpoint".to_string(),
        })?;

        let path = self.rendezvous_path(node.name());
        let command = ProxyCommand::socat(&path, &endpoint);
        cluster_info!(scope, "🔌 Running {} in background", command.command_line());

        let mut proxy = self.launcher.spawn(node.name(), &command.program, &command.args)?;

        if let Err(reason) = self.confirm(&proxy, &path).await {
            proxy.kill().await;
            return Err(ClusterError::ProxySpawnFailed {
                name: node.name().to_string(),
                reason,
            });
        }

        node.set_rendezvous(path.clone())?;
        cluster_debug!(scope, "🔌 {} reachable through {}", node.name(), path.display());
        Ok(proxy)
    }

    async fn confirm(&self, proxy: &SupervisedProcess, path: &Path) -> Result<(), String> {
        let wait = async {
            loop {
                if tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Ok(());
                }
                if let Some(exit) = proxy.exit_status() {
                    return Err(format!("bridge exited before listening: {exit:?}"));
                }
                sleep(CONFIRM_POLL).await;
            }
        };

        match timeout(self.confirm_timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(format!(
                "{} did not appear within {:?}",
                path.display(),
                self.confirm_timeout
            )),
        }
    }
}
