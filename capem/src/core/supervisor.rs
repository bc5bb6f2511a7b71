//! Supervised background processes
//!
//! A [`SupervisedProcess`] owns its child through a watcher task. The watcher
//! reports an unexpected exit as soon as it happens and performs the kill and
//! reap when asked to, so no proxy is ever left as an orphan or a zombie.

use shared::{cluster_debug, cluster_warn, LogScope};
use std::io;
use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// How a supervised process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// Exited on its own, with the exit code when there was one
    Exited(Option<i32>),
    /// Killed and reaped on request
    Killed,
    /// The exit status could not be collected
    WaitFailed(String),
}

pub struct SupervisedProcess {
    label: String,
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exit_rx: watch::Receiver<Option<ProcessExit>>,
    watcher: Option<JoinHandle<()>>,
}

impl SupervisedProcess {
    /// Spawn `command` and start watching it
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(label: impl Into<String>, mut command: Command) -> io::Result<Self> {
        let label = label.into();
        command.kill_on_drop(true);
        let mut child = command.spawn()?;
        let pid = child.id();

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let (exit_tx, exit_rx) = watch::channel(None);
        let scope = LogScope::Proxy(label.clone());

        let watcher = tokio::spawn(async move {
            let exit = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => {
                        cluster_warn!(scope, "⚠️ Background process exited unexpectedly with {}", status);
                        ProcessExit::Exited(status.code())
                    }
                    Err(e) => {
                        cluster_warn!(scope, "⚠️ Lost track of background process: {}", e);
                        ProcessExit::WaitFailed(e.to_string())
                    }
                },
                // Fires on an explicit kill and when the handle is dropped
                _ = kill_rx => match child.kill().await {
                    Ok(()) => ProcessExit::Killed,
                    Err(e) => ProcessExit::WaitFailed(e.to_string()),
                },
            };
            let _ = exit_tx.send(Some(exit));
        });

        Ok(Self {
            label,
            pid,
            kill_tx: Some(kill_tx),
            exit_rx,
            watcher: Some(watcher),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit observed so far, `None` while the process is running
    pub fn exit_status(&self) -> Option<ProcessExit> {
        self.exit_rx.borrow().clone()
    }

    /// True when the process went away without being asked to
    pub fn exited_unexpectedly(&self) -> bool {
        matches!(
            self.exit_status(),
            Some(ProcessExit::Exited(_)) | Some(ProcessExit::WaitFailed(_))
        )
    }

    /// SIGKILL the process and wait until it has been reaped
    pub async fn kill(&mut self) -> ProcessExit {
        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(());
        }
        if let Some(watcher) = self.watcher.take() {
            if let Err(e) = watcher.await {
                return ProcessExit::WaitFailed(e.to_string());
            }
        }

        let exit = self.exit_status().unwrap_or(ProcessExit::Killed);
        cluster_debug!(LogScope::Proxy(self.label.clone()), "🛑 Background process finished: {:?}", exit);
        exit
    }
}

impl std::fmt::Debug for SupervisedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisedProcess")
            .field("label", &self.label)
            .field("pid", &self.pid)
            .field("exit", &self.exit_status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sleeper(secs: u32) -> Command {
        let mut cmd = Command::new("sleep");
        cmd.arg(secs.to_string());
        cmd
    }

    #[tokio::test]
    async fn test_kill_reaps_running_process() {
        let mut process = SupervisedProcess::spawn("sleeper", sleeper(60)).unwrap();
        assert!(process.pid().is_some());
        assert_eq!(process.exit_status(), None);

        assert_eq!(process.kill().await, ProcessExit::Killed);
        assert!(!process.exited_unexpectedly());
    }

    #[tokio::test]
    async fn test_unexpected_exit_is_reported() {
        let mut process = SupervisedProcess::spawn("short", Command::new("true")).unwrap();

        for _ in 0..50 {
            if process.exit_status().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(process.exited_unexpectedly());
        assert_eq!(process.kill().await, ProcessExit::Exited(Some(0)));
    }

    #[tokio::test]
    async fn test_kill_twice_is_harmless() {
        let mut process = SupervisedProcess::spawn("sleeper", sleeper(60)).unwrap();
        assert_eq!(process.kill().await, ProcessExit::Killed);
        assert_eq!(process.kill().await, ProcessExit::Killed);
    }

    #[tokio::test]
    async fn test_spawn_failure_surfaces_io_error() {
        let result = SupervisedProcess::spawn("missing", Command::new("/nonexistent/capem-binary"));
        assert!(result.is_err());
    }
}
