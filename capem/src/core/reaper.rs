//! Teardown of every environment and background process a run created

use serde::Serialize;
use shared::{cluster_info, cluster_warn, LogScope};
use std::sync::Arc;

use super::registry::StartedEnvironment;
use super::supervisor::{ProcessExit, SupervisedProcess};
use crate::traits::EnvironmentRunner;

/// What teardown did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    /// Environments a stop was issued for, in the order they were started
    pub stop_attempts: Vec<String>,
    /// Environments whose stop failed
    pub stop_failures: Vec<String>,
    /// Background processes killed and reaped
    pub processes_killed: usize,
    /// Background processes that had already exited on their own
    pub processes_exited_early: Vec<String>,
}

pub struct Reaper {
    environment: Arc<dyn EnvironmentRunner>,
}

impl Reaper {
    pub fn new(environment: Arc<dyn EnvironmentRunner>) -> Self {
        Self { environment }
    }

    /// Stop every started environment and kill every background process
    ///
    /// Best effort throughout: one failure never prevents the next attempt.
    pub async fn teardown(&self, started: Vec<StartedEnvironment>, proxies: Vec<SupervisedProcess>) -> TeardownReport {
        let mut report = TeardownReport::default();

        for env in started {
            cluster_info!(LogScope::Reaper, "🛑 Stopping container {}", env.name);
            if let Err(e) = self.environment.stop(&env.name).await {
                cluster_warn!(LogScope::Reaper, "⚠️ Container {} failed to stop: {}", env.name, e);
                report.stop_failures.push(env.name.clone());
            }
            report.stop_attempts.push(env.name);
        }

        for mut proxy in proxies {
            match proxy.kill().await {
                ProcessExit::Killed => report.processes_killed += 1,
                other => {
                    cluster_warn!(LogScope::Reaper, "⚠️ Proxy {} had already ended: {:?}", proxy.label(), other);
                    report.processes_exited_early.push(proxy.label().to_string());
                }
            }
        }

        cluster_info!(
            LogScope::Reaper,
            "🧹 Teardown complete: {} environments stopped ({} failed), {} processes killed",
            report.stop_attempts.len(),
            report.stop_failures.len(),
            report.processes_killed
        );
        report
    }
}
