//! Service implementations
//!
//! Real, shell-backed implementations of every collaborator trait.

pub mod cleanup;
pub mod docker;
pub mod hosts;
pub mod launcher;
pub mod mysql;
pub mod netem;
pub mod shell;
pub mod sysbench;

#[cfg(test)]
mod tests;

pub use cleanup::CleanupManager;
pub use docker::DockerCli;
pub use hosts::HostsFile;
pub use launcher::ShellLauncher;
pub use mysql::{MysqlAdmin, MysqlClient};
pub use netem::NetemShaper;
pub use shell::ShellRunner;
pub use sysbench::Sysbench;

use std::sync::Arc;

use crate::config::ClusterConfig;
use crate::orchestrator::ClusterServices;

/// Services talking to docker, mysql, sysbench, tc and socat on this host
pub fn real_services(config: &ClusterConfig) -> ClusterServices {
    let docker = Arc::new(DockerCli::new(&config.build_dir));

    ClusterServices {
        environment: docker.clone(),
        images: docker,
        readiness: Arc::new(MysqlAdmin::new()),
        sql: Arc::new(MysqlClient::new()),
        workload: Arc::new(Sysbench::new()),
        shaper: Arc::new(NetemShaper::new()),
        launcher: Arc::new(ShellLauncher::new()),
    }
}
