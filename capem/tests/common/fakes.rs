//! Recording fakes for every collaborator
//!
//! All fakes append to one shared [`EventLog`], so tests can assert on the
//! order in which the orchestrator talked to the outside world.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;

use capem::core::{LaunchSpec, SupervisedProcess, WorkloadInvocation, WorkloadPhase};
use capem::{
    ClusterError, ClusterResult, EnvironmentRunner, ImageBuilder, InspectField, NetworkShaper, ProcessLauncher,
    ReadinessCheck, SqlProbe, WorkloadGenerator,
};
use shared::{Endpoint, NetDelay};

use super::fixtures::TestFixtures;

/// Ordered record of every external call
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Events starting with `prefix`, with the prefix removed
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_string))
            .collect()
    }

    /// Position of the first event equal to `event`
    pub fn position(&self, event: &str) -> Option<usize> {
        self.all().iter().position(|e| e == event)
    }
}

pub struct FakeEnvironment {
    pub log: EventLog,
    pub fail_start: Option<String>,
    /// Start of this environment never completes
    pub stall_start: Option<String>,
}

#[async_trait]
impl EnvironmentRunner for FakeEnvironment {
    async fn start(&self, name: &str, _spec: &LaunchSpec) -> ClusterResult<()> {
        if self.fail_start.as_deref() == Some(name) {
            return Err(ClusterError::EnvironmentStartFailed {
                name: name.to_string(),
                reason: "image not found".to_string(),
            });
        }
        if self.stall_start.as_deref() == Some(name) {
            self.log.push(format!("stalled:{name}"));
            std::future::pending::<()>().await;
        }
        self.log.push(format!("start:{name}"));
        Ok(())
    }

    async fn inspect(&self, name: &str, field: InspectField) -> ClusterResult<String> {
        Ok(match field {
            InspectField::IpAddress => TestFixtures::ip_of(name),
            InspectField::Pid => TestFixtures::pid_of(name).to_string(),
            InspectField::HostPort => format!("{}\n", TestFixtures::port_of(name)),
            InspectField::HostIp => TestFixtures::HOST_IP.to_string(),
        })
    }

    async fn stop(&self, name: &str) -> ClusterResult<()> {
        self.log.push(format!("stop:{name}"));
        Ok(())
    }

    async fn remove(&self, name: &str) -> ClusterResult<()> {
        self.log.push(format!("remove:{name}"));
        Err(ClusterError::command(format!("docker rm -f {name}"), "No such container", ""))
    }
}

pub struct FakeImages {
    pub log: EventLog,
}

#[async_trait]
impl ImageBuilder for FakeImages {
    async fn ensure_artifact(&self, _url: &str, local_path: &Path) -> ClusterResult<()> {
        self.log.push(format!("artifact:{}", local_path.display()));
        Ok(())
    }

    async fn build(&self, variant: &str, tag: &str) -> ClusterResult<()> {
        self.log.push(format!("build:{variant}:{tag}"));
        Ok(())
    }
}

/// Answers pings except on the ports listed in `unreachable`; pings on
/// `hanging` ports never return
pub struct FakeReadiness {
    pub unreachable: HashSet<u16>,
    pub hanging: HashSet<u16>,
}

#[async_trait]
impl ReadinessCheck for FakeReadiness {
    async fn ping(&self, endpoint: &Endpoint) -> bool {
        if self.hanging.contains(&endpoint.port) {
            std::future::pending::<()>().await;
        }
        !self.unreachable.contains(&endpoint.port)
    }
}

/// Healthy status values unless overridden per variable
pub struct FakeSql {
    pub log: EventLog,
    pub overrides: HashMap<String, String>,
}

#[async_trait]
impl SqlProbe for FakeSql {
    async fn query(&self, sql: &str, socket: &Path) -> ClusterResult<String> {
        let node = socket.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        self.log.push(format!("sql:{node}:{sql}"));

        if let Some((_, value)) = self.overrides.iter().find(|(variable, _)| sql.contains(variable.as_str())) {
            return Ok(value.clone());
        }
        let value = if sql.contains("wsrep_cluster_status") {
            "Primary"
        } else if sql.contains("wsrep_local_state_comment") {
            "Synced"
        } else if sql.contains("wsrep_local") {
            "0"
        } else {
            ""
        };
        Ok(value.to_string())
    }
}

/// Records each phase; a benchmark can be made to run for a while
pub struct FakeWorkload {
    pub log: EventLog,
    pub benchmark_time: Duration,
    pub invocations: Arc<Mutex<Vec<WorkloadInvocation>>>,
}

#[async_trait]
impl WorkloadGenerator for FakeWorkload {
    async fn run(&self, invocation: &WorkloadInvocation) -> ClusterResult<()> {
        self.log.push(format!("workload:{}", invocation.phase));
        self.invocations.lock().unwrap().push(invocation.clone());

        if matches!(invocation.phase, WorkloadPhase::Benchmark { .. }) && !self.benchmark_time.is_zero() {
            tokio::time::sleep(self.benchmark_time).await;
        }
        Ok(())
    }
}

pub struct FakeShaper {
    pub log: EventLog,
}

#[async_trait]
impl NetworkShaper for FakeShaper {
    async fn add_delay(&self, pid: u32, interface: &str, delay: NetDelay) -> ClusterResult<()> {
        self.log.push(format!("delay:{pid}:{interface}:{delay}"));
        Ok(())
    }
}

/// Creates the listening socket path itself and parks a `sleep` as the proxy
pub struct FakeLauncher {
    pub log: EventLog,
}

fn listen_path(args: &[String]) -> Option<PathBuf> {
    let spec = args.first()?.strip_prefix("UNIX-LISTEN:")?;
    spec.split(',').next().map(PathBuf::from)
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    fn spawn(&self, label: &str, program: &str, args: &[String]) -> ClusterResult<SupervisedProcess> {
        self.log.push(format!("proxy:{label}:{program}"));

        let path = listen_path(args).ok_or_else(|| ClusterError::ProxySpawnFailed {
            name: label.to_string(),
            reason: format!("unexpected proxy arguments {args:?}"),
        })?;
        std::fs::write(&path, b"")?;

        let mut sleeper = Command::new("sleep");
        sleeper.arg("60");
        Ok(SupervisedProcess::spawn(label, sleeper)?)
    }

    async fn kill_strays(&self, pattern: &str) -> usize {
        self.log.push(format!("kill-strays:{pattern}"));
        0
    }
}
