//! Docker CLI backed environment runner and image builder

use async_trait::async_trait;
use shared::{cluster_info, LogScope};
use std::path::{Path, PathBuf};

use super::shell::{argv, ShellRunner};
use crate::config::SERVICE_PORT;
use crate::core::launch::LaunchSpec;
use crate::error::{ClusterError, ClusterResult};
use crate::traits::{EnvironmentRunner, ImageBuilder, InspectField};

/// Go template extracting `field` from `docker inspect`
pub fn inspect_template(field: InspectField) -> String {
    match field {
        InspectField::IpAddress => "{{.NetworkSettings.IPAddress}}".to_string(),
        InspectField::Pid => "{{.State.Pid}}".to_string(),
        InspectField::HostPort => format!("{{{{(index (index .NetworkSettings.Ports \"{SERVICE_PORT}/tcp\") 0).HostPort}}}}"),
        InspectField::HostIp => format!("{{{{(index (index .NetworkSettings.Ports \"{SERVICE_PORT}/tcp\") 0).HostIp}}}}"),
    }
}

pub struct DockerCli {
    shell: ShellRunner,
    build_dir: PathBuf,
}

impl DockerCli {
    /// `build_dir` holds the Dockerfiles and the downloaded tarball
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            shell: ShellRunner::new(),
            build_dir: build_dir.into(),
        }
    }
}

#[async_trait]
impl EnvironmentRunner for DockerCli {
    async fn start(&self, name: &str, spec: &LaunchSpec) -> ClusterResult<()> {
        let cmdline = format!("docker run {spec}");
        cluster_info!(LogScope::Node(name.to_string()), "🐳 Starting container {} with {}", name, cmdline);

        self.shell
            .script(&format!("{cmdline} >/dev/null"), &format!("Container {name} failed to start"))
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::EnvironmentStartFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    async fn inspect(&self, name: &str, field: InspectField) -> ClusterResult<String> {
        let out = self
            .shell
            .run(
                "docker",
                &argv(&["inspect", "-f", &inspect_template(field), name]),
                &format!("Failed to inspect container {name} for {field}"),
            )
            .await?;
        Ok(out.replace('\n', ""))
    }

    async fn stop(&self, name: &str) -> ClusterResult<()> {
        self.shell
            .run("docker", &argv(&["stop", name]), &format!("Container {name} failed to stop"))
            .await
            .map(|_| ())
    }

    async fn remove(&self, name: &str) -> ClusterResult<()> {
        self.shell
            .run("docker", &argv(&["rm", "-f", name]), &format!("Failed to remove container {name}"))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ImageBuilder for DockerCli {
    async fn ensure_artifact(&self, url: &str, local_path: &Path) -> ClusterResult<()> {
        if tokio::fs::try_exists(local_path).await? {
            cluster_info!(LogScope::Orchestrator, "📦 {} already present, skipping download", local_path.display());
            return Ok(());
        }

        let target = local_path.display().to_string();
        self.shell
            .run("wget", &argv(&["-O", &target, url]), &format!("Failed to download tar.gz from {url}"))
            .await
            .map(|_| ())
    }

    async fn build(&self, variant: &str, tag: &str) -> ClusterResult<()> {
        cluster_info!(LogScope::Orchestrator, "🏗️ Building {} from Dockerfile.{}", tag, variant);
        let dockerfile = format!("Dockerfile.{variant}");

        ShellRunner::in_dir(&self.build_dir)
            .run(
                "docker",
                &argv(&["build", "--rm", "-t", tag, "-f", &dockerfile, "."]),
                &format!("Failed to build image for {tag}"),
            )
            .await
            .map(|_| ())
    }
}
