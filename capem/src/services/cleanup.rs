//! Stray process cleanup
//!
//! Finds leftovers from earlier runs by command line and SIGKILLs them.
//! Everything here is best effort: nothing to clean is the common case.

use shared::{cluster_debug, cluster_info, cluster_warn, LogScope};
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, Default)]
pub struct CleanupManager;

impl CleanupManager {
    pub fn new() -> Self {
        Self
    }

    /// Kill every process whose full command line matches `pattern`; returns how many died
    pub async fn kill_matching(&self, pattern: &str) -> usize {
        let own_pid = std::process::id() as i32;
        let mut killed = 0;

        for pid in self.find_processes(pattern).await {
            if pid == own_pid {
                continue;
            }
            if self.kill_process(pid) {
                killed += 1;
            }
        }

        if killed > 0 {
            cluster_info!(LogScope::Orchestrator, "🔪 Killed {} stray '{}' processes", killed, pattern);
        } else {
            cluster_debug!(LogScope::Orchestrator, "✅ No '{}' processes found to kill", pattern);
        }
        killed
    }

    /// Process ids whose command line matches `pattern`
    pub async fn find_processes(&self, pattern: &str) -> Vec<i32> {
        let output = Command::new("pgrep")
            .arg("-f")
            .arg(pattern)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            // pgrep exits non-zero when nothing matches
            Ok(output) if output.status.success() => parse_pids(&String::from_utf8_lossy(&output.stdout)),
            Ok(_) => Vec::new(),
            Err(e) => {
                cluster_warn!(LogScope::Orchestrator, "⚠️ pgrep unavailable: {}", e);
                Vec::new()
            }
        }
    }

    fn kill_process(&self, pid: i32) -> bool {
        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            match signal::kill(Pid::from_raw(pid), Signal::SIGKILL) {
                Ok(()) => {
                    cluster_debug!(LogScope::Orchestrator, "🔪 Killed process {}", pid);
                    true
                }
                Err(nix::errno::Errno::ESRCH) => false,
                Err(e) => {
                    cluster_warn!(LogScope::Orchestrator, "⚠️ Failed to kill process {}: {}", pid, e);
                    false
                }
            }
        }

        #[cfg(not(unix))]
        {
            cluster_warn!(LogScope::Orchestrator, "⚠️ Process killing not implemented for pid {}", pid);
            false
        }
    }
}

fn parse_pids(stdout: &str) -> Vec<i32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<i32>().ok())
        .collect()
}
