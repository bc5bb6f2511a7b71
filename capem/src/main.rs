//! Command line entry point
//!
//! Builds a [`ClusterConfig`] from the arguments, wires the real services and
//! drives one cluster run.

use anyhow::Context;
use clap::Parser;
use shared::{cluster_info, logging, LogScope, NetDelay};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;

use capem::config::{DEFAULT_NODE_COMMAND, DEFAULT_TARBALL_URL};
use capem::services::real_services;
use capem::{ClusterConfig, ClusterOrchestrator, FaultSettings, SanityCheck, WorkloadSettings};

/// Bring up a database cluster in containers, benchmark it and inject faults
#[derive(Parser, Debug)]
#[command(name = "capem")]
#[command(about = "Cluster lifecycle and fault-injection orchestrator")]
pub struct Args {
    /// Platform the node image is built for (selects Dockerfile.<platform>)
    #[arg(long, env = "CAPEM_PLATFORM", default_value = "centos7-64")]
    pub platform: String,

    /// Number of cluster nodes
    #[arg(long = "numc", env = "CAPEM_NUMC", default_value_t = 3)]
    pub node_count: usize,

    /// Readiness probe attempts per node
    #[arg(long = "rcount", env = "CAPEM_RCOUNT", default_value_t = 10)]
    pub retries: u32,

    /// Directory holding the sysbench lua scripts
    #[arg(long = "spath", env = "CAPEM_SPATH", default_value = "/pxc56/db")]
    pub script_dir: String,

    /// sysbench test to run
    #[arg(long = "stest", env = "CAPEM_STEST", default_value = "oltp")]
    pub test_name: String,

    /// Auto-inc mode for sysbench
    #[arg(long = "autoinc", env = "CAPEM_AUTOINC", default_value = "off")]
    pub auto_inc: String,

    /// Number of sysbench threads
    #[arg(long = "numt", env = "CAPEM_NUMT", default_value_t = 8)]
    pub threads: u32,

    /// Rows per table
    #[arg(long = "osize", env = "CAPEM_OSIZE", default_value_t = 500)]
    pub table_size: u32,

    /// Number of tables
    #[arg(long = "ocount", env = "CAPEM_OCOUNT", default_value_t = 8)]
    pub table_count: u32,

    /// Benchmark duration in seconds
    #[arg(long, env = "CAPEM_DURATION", default_value_t = 300)]
    pub duration: u64,

    /// Index updates per transaction
    #[arg(long = "indup", env = "CAPEM_INDUP", default_value_t = 15)]
    pub index_updates: u32,

    /// Non-index updates per transaction
    #[arg(long = "nindup", env = "CAPEM_NINDUP", default_value_t = 15)]
    pub non_index_updates: u32,

    /// Latency added between nodes (e.g. 3ms, 500us)
    #[arg(long, env = "CAPEM_DELAY", default_value = "3ms")]
    pub delay: NetDelay,

    /// Additional wsrep provider options
    #[arg(long = "addop", env = "CAPEM_ADDOP", default_value = "evs.auto_evict=3; evs.version=1; gcache.size=256M")]
    pub provider_options: String,

    /// Node entry command
    #[arg(long = "cmd", env = "CAPEM_CMD", default_value = DEFAULT_NODE_COMMAND)]
    pub node_command: String,

    /// Extra arguments appended to the node command
    #[arg(long = "ecmd", env = "CAPEM_ECMD", default_value = "--wsrep-sst-method=rsync --core-file")]
    pub extra_command: String,

    /// Extra arguments for the bootstrap node
    #[arg(long, env = "CAPEM_BOOTSTRAP_OPTS", default_value = "--wsrep-new-cluster")]
    pub bootstrap_opts: String,

    /// Extra arguments for joining nodes
    #[arg(long, env = "CAPEM_JOIN_OPTS", default_value = "")]
    pub join_opts: String,

    /// Node tarball to build the image from
    #[arg(long, env = "CAPEM_TARBALL_URL", default_value = DEFAULT_TARBALL_URL)]
    pub tarball_url: String,

    /// Docker build context holding the Dockerfiles
    #[arg(long, env = "CAPEM_DOCKER_DIR", default_value = "docker")]
    pub docker_dir: PathBuf,

    /// Interface inside each node that receives the latency
    #[arg(long, env = "CAPEM_INTERFACE", default_value = "eth0")]
    pub interface: String,

    /// First delay between readiness probes in milliseconds
    #[arg(long, env = "CAPEM_PROBE_DELAY_MS", default_value_t = 1000)]
    pub probe_delay_ms: u64,

    /// Upper bound on the delay between readiness probes in milliseconds
    #[arg(long, env = "CAPEM_PROBE_MAX_DELAY_MS", default_value_t = 8000)]
    pub probe_max_delay_ms: u64,

    /// How long a proxy gets to create its socket
    #[arg(long, env = "CAPEM_PROXY_TIMEOUT_SECS", default_value_t = 5)]
    pub proxy_timeout_secs: u64,

    /// How long to wait for all joiners to become ready
    #[arg(long, env = "CAPEM_JOIN_TIMEOUT_SECS", default_value_t = 600)]
    pub join_timeout_secs: u64,

    /// Hard limit on the whole run
    #[arg(long, env = "CAPEM_RUN_DEADLINE_SECS", default_value_t = 3600)]
    pub run_deadline_secs: u64,

    /// Pause between the start of the second benchmark and the first node stop
    #[arg(long, env = "CAPEM_FAULT_DELAY_SECS", default_value_t = 30)]
    pub fault_delay_secs: u64,

    /// Use the existing node image instead of building it
    #[arg(long, env = "CAPEM_SKIP_BUILD")]
    pub skip_build: bool,

    /// Skip the post bring-up sanity checks
    #[arg(long, env = "CAPEM_NO_SANITY")]
    pub no_sanity: bool,

    /// Do not add latency between nodes
    #[arg(long, env = "CAPEM_NO_LATENCY")]
    pub no_latency: bool,

    /// Skip the node stopping round
    #[arg(long, env = "CAPEM_NO_FAULTS")]
    pub no_faults: bool,

    /// Write a JSON run report to this path
    #[arg(long, env = "CAPEM_REPORT")]
    pub report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CAPEM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn into_config(self) -> ClusterConfig {
        ClusterConfig {
            platform: self.platform,
            node_count: self.node_count,
            node_command: self.node_command,
            extra_command: self.extra_command,
            provider_options: self.provider_options,
            bootstrap_options: self.bootstrap_opts,
            join_options: self.join_opts,
            tarball_url: self.tarball_url,
            build_dir: self.docker_dir,
            skip_build: self.skip_build,
            probe_attempts: self.retries,
            probe_delay: Duration::from_millis(self.probe_delay_ms),
            probe_max_delay: Duration::from_millis(self.probe_max_delay_ms),
            proxy_timeout: Duration::from_secs(self.proxy_timeout_secs),
            join_timeout: Duration::from_secs(self.join_timeout_secs),
            run_deadline: Duration::from_secs(self.run_deadline_secs),
            workload: WorkloadSettings {
                script_dir: self.script_dir,
                test_name: self.test_name,
                auto_inc: self.auto_inc,
                threads: self.threads,
                table_size: self.table_size,
                table_count: self.table_count,
                duration_secs: self.duration,
                index_updates: self.index_updates,
                non_index_updates: self.non_index_updates,
            },
            sanity_checks: if self.no_sanity { Vec::new() } else { SanityCheck::defaults() },
            latency: (!self.no_latency).then_some(self.delay),
            interface: self.interface,
            faults: (!self.no_faults).then(|| FaultSettings {
                stop_after: Duration::from_secs(self.fault_delay_secs),
            }),
            report_path: self.report,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is the normal case
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));

    let config = args.into_config();
    let report_path = config.report_path.clone();
    cluster_info!(
        LogScope::Orchestrator,
        "Nodes: {}, threads: {}, duration: {}s",
        config.node_count,
        config.workload.threads,
        config.workload.duration_secs
    );

    let services = real_services(&config);
    let mut orchestrator = ClusterOrchestrator::new(config, services).context("Invalid cluster configuration")?;

    let shutdown_sender = orchestrator.get_shutdown_sender();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_shutdown(&LogScope::Orchestrator, "Received Ctrl+C signal");
                let _ = shutdown_sender.send(()).await;
            }
            Err(err) => {
                logging::log_error(&LogScope::Orchestrator, "Signal handling", &err);
            }
        }
    });

    let result = orchestrator.execute().await;

    if let Some(path) = report_path {
        let outcome = match &result {
            Ok(()) => "completed".to_string(),
            Err(e) => format!("failed: {e}"),
        };
        orchestrator
            .report(&outcome)
            .write_to(&path)
            .await
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        cluster_info!(LogScope::Orchestrator, "📝 Run report written to {}", path.display());
    }

    result.context("Cluster run failed")?;
    logging::log_success(&LogScope::Orchestrator, "Cluster run finished cleanly");
    Ok(())
}
