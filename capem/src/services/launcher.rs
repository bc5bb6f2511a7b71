//! Background process launcher used for the socket proxies

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use super::cleanup::CleanupManager;
use super::shell::command_line;
use crate::core::supervisor::SupervisedProcess;
use crate::error::{ClusterError, ClusterResult};
use crate::traits::ProcessLauncher;

#[derive(Debug, Clone, Default)]
pub struct ShellLauncher {
    cleanup: CleanupManager,
}

impl ShellLauncher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessLauncher for ShellLauncher {
    fn spawn(&self, label: &str, program: &str, args: &[String]) -> ClusterResult<SupervisedProcess> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        SupervisedProcess::spawn(label, command).map_err(|e| ClusterError::ProxySpawnFailed {
            name: label.to_string(),
            reason: format!("{}: {e}", command_line(program, args)),
        })
    }

    async fn kill_strays(&self, pattern: &str) -> usize {
        self.cleanup.kill_matching(pattern).await
    }
}
