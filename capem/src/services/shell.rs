//! Command execution shared by every shell-backed service
//!
//! Each invocation is logged before it runs; a non-zero exit becomes a
//! [`ClusterError::CommandFailed`] carrying the command line, the caller's
//! failure message and whatever the command wrote to stderr.

use shared::{cluster_debug, cluster_error, cluster_info, LogScope};
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;

use crate::error::{ClusterError, ClusterResult};

#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    working_dir: Option<PathBuf>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }

    /// Run `program` with `args` and return its stdout
    pub async fn run(&self, program: &str, args: &[String], failure: &str) -> ClusterResult<String> {
        let line = command_line(program, args);
        let mut command = self.command(program);
        command.args(args);
        self.capture(command, &line, failure).await
    }

    /// Run `script` through `sh -c`, for invocations that rely on shell quoting
    pub async fn script(&self, script: &str, failure: &str) -> ClusterResult<String> {
        let mut command = self.command("sh");
        command.arg("-c").arg(script);
        self.capture(command, script, failure).await
    }

    /// Run `program` with the terminal attached, for long jobs whose progress the user watches
    ///
    /// The caller logs the command line; this only reports failure.
    pub async fn passthrough(&self, program: &str, args: &[String], failure: &str) -> ClusterResult<()> {
        let line = command_line(program, args);

        let status = self
            .command(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| ClusterError::command(&line, failure, e.to_string()))?;

        if !status.success() {
            cluster_error!(LogScope::Orchestrator, "❌ {} ({})", failure, status);
            return Err(ClusterError::command(line, failure, format!("exited with {status}")));
        }
        Ok(())
    }

    /// True when the command exits zero; output is discarded
    pub async fn succeeds(&self, program: &str, args: &[String]) -> bool {
        let status = self
            .command(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        matches!(status, Ok(s) if s.success())
    }

    /// A run that is cancelled takes its in-flight command down with it
    fn command(&self, program: &str) -> Command {
        let mut command = Command::new(program);
        command.kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }

    async fn capture(&self, mut command: Command, line: &str, failure: &str) -> ClusterResult<String> {
        cluster_info!(LogScope::Orchestrator, "Running {}", line);

        let output: Output = command
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ClusterError::command(line, failure, e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            cluster_error!(LogScope::Orchestrator, "❌ {}: {}", failure, line);
            return Err(ClusterError::command(line, failure, stderr));
        }

        cluster_debug!(LogScope::Orchestrator, "{} returned {} bytes", line, stdout.len());
        Ok(stdout)
    }
}

pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Owned argument list from borrowed parts
pub fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_stdout() {
        let shell = ShellRunner::new();
        let out = shell.run("echo", &argv(&["hello", "world"]), "echo failed").await.unwrap();
        assert_eq!(out.trim(), "hello world");
    }

    #[tokio::test]
    async fn test_failure_carries_command_and_stderr() {
        let shell = ShellRunner::new();
        let err = shell
            .script("echo boom >&2; exit 3", "Container Dock1 failed to start")
            .await
            .unwrap_err();

        match err {
            ClusterError::CommandFailed { command, message, stderr } => {
                assert!(command.contains("exit 3"));
                assert_eq!(message, "Container Dock1 failed to start");
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_working_directory_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let shell = ShellRunner::in_dir(dir.path());
        let out = shell.run("pwd", &[], "pwd failed").await.unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(PathBuf::from(out.trim()).canonicalize().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_succeeds_reports_exit_status() {
        let shell = ShellRunner::new();
        assert!(shell.succeeds("true", &[]).await);
        assert!(!shell.succeeds("false", &[]).await);
        assert!(!shell.succeeds("capem-no-such-binary", &[]).await);
    }

    #[tokio::test]
    async fn test_cancelled_command_is_killed() {
        let shell = ShellRunner::new();
        let pattern = argv(&["-f", "^sleep 41\\.5$"]);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(300),
            shell.passthrough("sleep", &argv(&["41.5"]), "sleep failed"),
        )
        .await;
        assert!(cancelled.is_err());

        let mut survivor = true;
        for _ in 0..40 {
            survivor = shell.succeeds("pgrep", &pattern).await;
            if !survivor {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!survivor, "sleep kept running after its run was cancelled");
    }

    #[test]
    fn test_command_line_rendering() {
        assert_eq!(command_line("docker", &argv(&["stop", "Dock2"])), "docker stop Dock2");
    }
}
