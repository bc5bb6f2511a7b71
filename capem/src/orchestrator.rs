//! Cluster lifecycle orchestrator
//!
//! [`ClusterOrchestrator`] owns everything one run needs: the configuration,
//! the injected services, the per-run job directory and the node registry.
//! It is the only writer of the registry. Joiner bring-up runs in background
//! tasks that hand finished nodes back over the ready channel.

use chrono::Utc;
use shared::{cluster_debug, cluster_error, cluster_info, cluster_warn, logging, Endpoint, LogScope, NetDelay};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{sleep_until, timeout, Instant};

use crate::config::{node_name, ClusterConfig, FaultSettings, INFRA_NAME, MAX_NODES, NODE_PREFIX, TARBALL_FILE};
use crate::core::{
    plan_stop_targets, BringUp, FaultInjector, LaunchSpec, Node, NodeRegistry, NodeRole, ReadinessProber, Reaper,
    RetryPolicy, SanityChecker, SocketProxySpawner, TeardownReport, WorkloadInvocation,
};
use crate::error::{ClusterError, ClusterResult};
use crate::report::{NodeSummary, PhaseRecord, RunReport};
use crate::services::HostsFile;
use crate::traits::{
    EnvironmentRunner, ImageBuilder, InspectField, NetworkShaper, ProcessLauncher, ReadinessCheck, SqlProbe,
    WorkloadGenerator,
};

/// Every external collaborator a run talks to
#[derive(Clone)]
pub struct ClusterServices {
    pub environment: Arc<dyn EnvironmentRunner>,
    pub images: Arc<dyn ImageBuilder>,
    pub readiness: Arc<dyn ReadinessCheck>,
    pub sql: Arc<dyn SqlProbe>,
    pub workload: Arc<dyn WorkloadGenerator>,
    pub shaper: Arc<dyn NetworkShaper>,
    pub launcher: Arc<dyn ProcessLauncher>,
}

/// Scratch space of one run, removed when the run is dropped
pub struct RunContext {
    hosts: HostsFile,
    _hosts_file: NamedTempFile,
    job_dir: TempDir,
}

impl RunContext {
    pub fn new() -> ClusterResult<Self> {
        let job_dir = tempfile::Builder::new().prefix("capem").tempdir()?;
        let hosts_file = tempfile::Builder::new().prefix("dns").tempfile_in(job_dir.path())?;

        Ok(Self {
            hosts: HostsFile::new(hosts_file.path()),
            _hosts_file: hosts_file,
            job_dir,
        })
    }

    /// Holds the rendezvous sockets and the hosts file
    pub fn job_dir(&self) -> &Path {
        self.job_dir.path()
    }

    pub fn hosts(&self) -> &HostsFile {
        &self.hosts
    }
}

enum JoinEvent {
    Ready(Option<crate::core::ReadyNode>),
    Finished(Result<ClusterResult<()>, JoinError>),
    TimedOut,
}

pub struct ClusterOrchestrator {
    config: ClusterConfig,
    services: ClusterServices,
    context: RunContext,

    registry: NodeRegistry,
    bringup: BringUp,
    sanity: Option<SanityChecker>,
    injector: FaultInjector,
    reaper: Reaper,

    joiners: JoinSet<ClusterResult<()>>,
    infra_ip: Option<String>,
    phases: Vec<PhaseRecord>,
    teardown: Option<TeardownReport>,

    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Option<mpsc::Receiver<()>>,
}

impl ClusterOrchestrator {
    /// Validate the configuration and prepare a run
    pub fn new(config: ClusterConfig, services: ClusterServices) -> ClusterResult<Self> {
        config.validate()?;
        let context = RunContext::new()?;

        let policy = RetryPolicy::exponential(config.probe_attempts, config.probe_delay, config.probe_max_delay);
        let prober = Arc::new(ReadinessProber::new(services.readiness.clone(), policy));
        let spawner = Arc::new(SocketProxySpawner::new(
            services.launcher.clone(),
            context.job_dir(),
            config.proxy_timeout,
        ));

        let sanity = if config.sanity_checks.is_empty() {
            None
        } else {
            Some(SanityChecker::new(services.sql.clone(), config.sanity_checks.clone())?)
        };

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Ok(Self {
            registry: NodeRegistry::new(config.node_count),
            bringup: BringUp::new(prober, spawner),
            sanity,
            injector: FaultInjector::new(services.environment.clone(), services.shaper.clone()),
            reaper: Reaper::new(services.environment.clone()),
            joiners: JoinSet::new(),
            infra_ip: None,
            phases: Vec::new(),
            teardown: None,
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
            config,
            services,
            context,
        })
    }

    /// Sender that ends the run early; teardown still happens
    pub fn get_shutdown_sender(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    pub fn job_dir(&self) -> &Path {
        self.context.job_dir()
    }

    pub fn nodes(&self) -> &[Node] {
        self.registry.nodes()
    }

    /// Run the whole lifecycle, then tear down exactly once
    ///
    /// The run ends at the first fatal error, at the run deadline or on a
    /// shutdown signal, whichever comes first.
    pub async fn execute(&mut self) -> ClusterResult<()> {
        logging::log_startup(
            &LogScope::Orchestrator,
            &format!("{} node cluster on {}", self.config.node_count, self.config.platform),
        );

        let deadline = self.config.run_deadline;
        let mut shutdown_rx = self.shutdown_rx.take();

        let result = tokio::select! {
            outcome = timeout(deadline, self.run()) => match outcome {
                Ok(result) => result,
                Err(_) => Err(ClusterError::DeadlineExceeded(deadline)),
            },
            _ = wait_for_shutdown(&mut shutdown_rx) => {
                logging::log_shutdown(&LogScope::Orchestrator, "shutdown requested");
                Err(ClusterError::Interrupted("shutdown requested".to_string()))
            }
        };
        self.shutdown_rx = shutdown_rx;

        if let Err(e) = &result {
            logging::log_error(&LogScope::Orchestrator, "Cluster run", e);
        }

        self.teardown().await;
        result
    }

    async fn run(&mut self) -> ClusterResult<()> {
        self.preclean().await;
        self.prepare_image().await?;

        self.start_infrastructure().await?;
        self.start_bootstrap().await?;
        self.load_data().await?;

        self.start_joiners().await?;
        self.await_joiners().await?;

        if let Some(sanity) = &self.sanity {
            sanity.verify(self.registry.nodes()).await?;
            logging::log_success(&LogScope::Orchestrator, "All nodes passed sanity checks");
        }

        if let Some(delay) = self.config.latency {
            self.apply_latency(delay).await?;
        }

        self.run_benchmark(1).await?;

        if let Some(faults) = self.config.faults.clone() {
            self.run_fault_round(&faults).await?;
        }

        logging::log_success(&LogScope::Orchestrator, "Cluster run completed");
        Ok(())
    }

    /// Remove leftovers of earlier runs; every failure is ignored
    async fn preclean(&self) {
        cluster_info!(LogScope::Orchestrator, "🧹 Removing leftovers of earlier runs");
        let environment = &self.services.environment;

        let names = std::iter::once(INFRA_NAME.to_string()).chain((0..MAX_NODES).map(node_name));
        for name in names {
            if let Err(e) = environment.remove(&name).await {
                cluster_debug!(LogScope::Orchestrator, "Nothing to remove for {}: {}", name, e);
            }
        }

        let proxy_pattern = format!("socat UNIX-LISTEN:.*{NODE_PREFIX}[0-9]+\\.sock");
        self.services.launcher.kill_strays(&proxy_pattern).await;
        self.services.launcher.kill_strays(self.config.node_process_pattern()).await;
    }

    async fn prepare_image(&self) -> ClusterResult<()> {
        let tag = self.config.image_tag();
        if self.config.skip_build {
            cluster_info!(LogScope::Orchestrator, "⏭️ Skipping image build, using {}", tag);
            return Ok(());
        }

        cluster_info!(LogScope::Orchestrator, "Building {} from {}", tag, self.config.tarball_url);
        let tarball = self.config.build_dir.join(TARBALL_FILE);
        self.services.images.ensure_artifact(&self.config.tarball_url, &tarball).await?;
        self.services.images.build(&self.config.platform, &tag).await
    }

    async fn start_infrastructure(&mut self) -> ClusterResult<()> {
        let spec = LaunchSpec::infrastructure(self.context.hosts().path());
        // Recorded first so a start cut short by cancellation is still stopped
        self.registry.record_started(INFRA_NAME, NodeRole::Infrastructure).await?;
        self.services.environment.start(INFRA_NAME, &spec).await?;

        let ip = self.services.environment.inspect(INFRA_NAME, InspectField::IpAddress).await?;
        cluster_info!(LogScope::Node(INFRA_NAME.to_string()), "🌐 Name resolution at {}", ip);
        self.infra_ip = Some(ip).filter(|ip| !ip.is_empty());
        Ok(())
    }

    /// Launch the environment for node `index` and collect what bring-up needs
    async fn start_environment(&mut self, index: usize, role: NodeRole) -> ClusterResult<Node> {
        let name = node_name(index);
        let environment = self.services.environment.clone();

        let spec = LaunchSpec::node(&self.config, &name, role == NodeRole::Bootstrap, self.infra_ip.as_deref());
        self.registry.record_started(&name, role).await?;
        environment.start(&name, &spec).await?;

        let ip = environment.inspect(&name, InspectField::IpAddress).await?;
        self.context.hosts().append(&name, &ip).await?;

        let pid: u32 = self.inspect_parsed(&name, InspectField::Pid).await?;
        let port: u16 = self.inspect_parsed(&name, InspectField::HostPort).await?;
        let host = environment.inspect(&name, InspectField::HostIp).await?;

        cluster_info!(LogScope::Node(name.clone()), "🐳 {} started at {} (pid {}, {}:{})", name, ip, pid, host, port);
        Ok(Node::started(name, index, role, ip).with_process(pid, Endpoint::new(host, port)))
    }

    async fn inspect_parsed<T: FromStr>(&self, name: &str, field: InspectField) -> ClusterResult<T> {
        let value = self.services.environment.inspect(name, field).await?;
        value.trim().parse().map_err(|_| ClusterError::InspectFailed {
            name: name.to_string(),
            field: field.to_string(),
            value,
        })
    }

    /// The bootstrap node is brought up inline and admitted directly
    async fn start_bootstrap(&mut self) -> ClusterResult<()> {
        let node = self.start_environment(1, NodeRole::Bootstrap).await?;
        let ready = self.bringup.run(node).await?;
        self.registry.admit(ready)
    }

    /// Recreate the test databases on the bootstrap node and load the tables
    async fn load_data(&mut self) -> ClusterResult<()> {
        let socket = self
            .registry
            .bootstrap()
            .and_then(Node::rendezvous)
            .map(PathBuf::from)
            .ok_or_else(|| ClusterError::TaskFailed("bootstrap node was not admitted".to_string()))?;

        for sql in ["drop database test", "drop database testdb"] {
            if let Err(e) = self.services.sql.query(sql, &socket).await {
                cluster_debug!(LogScope::Orchestrator, "Ignoring failed '{}': {}", sql, e);
            }
        }
        for sql in ["create database test", "create database testdb"] {
            self.services.sql.query(sql, &socket).await?;
        }

        let invocation = WorkloadInvocation::prepare(socket, &self.config.workload);
        let started_at = Utc::now();
        let result = self.services.workload.run(&invocation).await;
        self.record_phase(&invocation, started_at, result.is_ok());
        result
    }

    /// Launch every joiner environment and hand its bring-up to a background task
    async fn start_joiners(&mut self) -> ClusterResult<()> {
        for index in 2..=self.config.node_count {
            // A joiner that already failed ends the run before more are launched
            while let Some(joined) = self.joiners.try_join_next() {
                joined_result(joined)?;
            }

            let node = self.start_environment(index, NodeRole::Joiner).await?;
            let bringup = self.bringup.clone();
            let ready_tx = self.registry.ready_sender();
            self.joiners.spawn(async move { bringup.publish(node, ready_tx).await });
        }
        Ok(())
    }

    /// Admit joiners as they become ready until all `node_count` nodes are in
    async fn await_joiners(&mut self) -> ClusterResult<()> {
        let expected = self.config.node_count;
        let join_timeout = self.config.join_timeout;
        let deadline = Instant::now() + join_timeout;

        while self.registry.len() < expected {
            let event = tokio::select! {
                ready = self.registry.recv_ready() => JoinEvent::Ready(ready),
                Some(joined) = self.joiners.join_next(), if !self.joiners.is_empty() => JoinEvent::Finished(joined),
                _ = sleep_until(deadline) => JoinEvent::TimedOut,
            };

            match event {
                JoinEvent::Ready(Some(ready)) => {
                    let name = ready.node.name().to_string();
                    self.registry.admit(ready)?;
                    cluster_info!(LogScope::Orchestrator, "📋 {} joined ({}/{})", name, self.registry.len(), expected);
                }
                JoinEvent::Ready(None) => return Err(ClusterError::ChannelClosed("ready channel".to_string())),
                JoinEvent::Finished(joined) => joined_result(joined)?,
                JoinEvent::TimedOut => {
                    return Err(ClusterError::JoinTimeout {
                        ready: self.registry.len(),
                        expected,
                        timeout: join_timeout,
                    })
                }
            }
        }

        logging::log_success(&LogScope::Orchestrator, &format!("All {expected} nodes are ready"));
        Ok(())
    }

    async fn apply_latency(&mut self, delay: NetDelay) -> ClusterResult<()> {
        cluster_info!(LogScope::Fault, "🐢 Adding {} of latency on {}", delay, self.config.interface);
        self.injector
            .apply_latency(self.registry.nodes(), &self.config.interface, delay)
            .await
    }

    async fn run_benchmark(&mut self, round: u8) -> ClusterResult<()> {
        self.warn_unexpected_exits();

        let invocation = WorkloadInvocation::benchmark(round, self.registry.active_rendezvous_paths(), &self.config.workload);
        let started_at = Utc::now();
        let result = self.services.workload.run(&invocation).await;
        self.record_phase(&invocation, started_at, result.is_ok());
        result
    }

    /// Second benchmark with node stopping running alongside it
    ///
    /// Losing nodes mid-benchmark is the point of this round, so a failed
    /// benchmark here is reported but does not fail the run.
    async fn run_fault_round(&mut self, faults: &FaultSettings) -> ClusterResult<()> {
        self.warn_unexpected_exits();

        let targets = plan_stop_targets(self.registry.nodes(), &mut rand::thread_rng());
        cluster_info!(
            LogScope::Fault,
            "🎯 Will stop {:?} {:?} into the next benchmark",
            targets.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            faults.stop_after
        );

        let invocation = WorkloadInvocation::benchmark(2, self.registry.active_rendezvous_paths(), &self.config.workload);
        let workload = self.services.workload.clone();
        let started_at = Utc::now();

        let (stopped, result) = tokio::join!(
            self.injector.stop_nodes(targets, faults.stop_after),
            workload.run(&invocation)
        );
        self.record_phase(&invocation, started_at, result.is_ok());

        for index in stopped {
            self.registry.mark_stopped(index)?;
        }
        if let Err(e) = result {
            cluster_warn!(LogScope::Orchestrator, "⚠️ Benchmark during node stopping ended with: {}", e);
        }
        Ok(())
    }

    fn warn_unexpected_exits(&self) {
        for name in self.registry.unexpected_proxy_exits() {
            cluster_warn!(LogScope::Proxy(name.clone()), "⚠️ Proxy for {} is no longer running", name);
        }
    }

    fn record_phase(&mut self, invocation: &WorkloadInvocation, started_at: chrono::DateTime<Utc>, success: bool) {
        self.phases.push(PhaseRecord {
            phase: invocation.phase,
            sockets: invocation.sockets.len(),
            started_at,
            finished_at: Utc::now(),
            success,
        });
    }

    /// Stop every started environment and kill every proxy
    ///
    /// Only the first call does any work; later calls return the same report.
    pub async fn teardown(&mut self) -> TeardownReport {
        if let Some(report) = &self.teardown {
            return report.clone();
        }

        // Aborted bring-up tasks drop their proxies, which kills them
        self.joiners.abort_all();
        while self.joiners.join_next().await.is_some() {}

        let started = self.registry.close_started();
        let proxies = self.registry.take_proxies();
        let report = self.reaper.teardown(started, proxies).await;

        if !report.stop_failures.is_empty() {
            cluster_error!(LogScope::Reaper, "❌ Failed to stop {:?}", report.stop_failures);
        }
        self.teardown = Some(report.clone());
        report
    }

    pub fn report(&self, outcome: &str) -> RunReport {
        RunReport {
            platform: self.config.platform.clone(),
            node_count: self.config.node_count,
            outcome: outcome.to_string(),
            nodes: self.registry.nodes().iter().map(NodeSummary::from).collect(),
            phases: self.phases.clone(),
            injections: self.injector.injection_log().to_vec(),
            teardown: self.teardown.clone(),
        }
    }
}

async fn wait_for_shutdown(rx: &mut Option<mpsc::Receiver<()>>) {
    match rx {
        Some(rx) => {
            rx.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn joined_result(joined: Result<ClusterResult<()>, JoinError>) -> ClusterResult<()> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(ClusterError::TaskFailed(e.to_string())),
    }
}
