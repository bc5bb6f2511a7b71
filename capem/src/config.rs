//! Run configuration
//!
//! [`ClusterConfig`] is built once per run (from the command line in `main`)
//! and handed to the orchestrator; nothing reads configuration from globals.

use shared::NetDelay;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::sanity::SanityCheck;
use crate::core::workload::WorkloadSettings;
use crate::error::{ClusterError, ClusterResult};

/// Name of the name-resolution helper environment
pub const INFRA_NAME: &str = "dnscluster";
/// Image of the name-resolution helper
pub const INFRA_IMAGE: &str = "ronin/dnsmasq";
/// Where the helper expects the hosts file
pub const HOSTS_MOUNT: &str = "/dnsmasq.hosts";
/// Domain appended to node names in the hosts file
pub const HOSTS_DOMAIN: &str = "ci.percona.com";
/// Prefix of cluster member names (`Dock1`, `Dock2`, ...)
pub const NODE_PREFIX: &str = "Dock";
/// Upper bound on cluster members, also the range swept by pre-run cleanup
pub const MAX_NODES: usize = 20;
/// Service port every node publishes
pub const SERVICE_PORT: u16 = 3306;
/// Image repository for node images
pub const IMAGE_REPO: &str = "ronin/pxc";
/// File name the node tarball is stored under inside the build directory
pub const TARBALL_FILE: &str = "Percona-XtraDB-Cluster.tar.gz";

pub const DEFAULT_TARBALL_URL: &str = "http://jenkins.percona.com/job/build-xtradb-cluster-binaries-56/BUILD_TYPE=release,label_exp=centos7-64/lastSuccessfulBuild/artifact/target/Percona-XtraDB-Cluster-5.6.22-25.8.262d88d73b6da1230a969e6148a59aeb408e7107.Linux.x86_64.tar.gz";

pub const DEFAULT_NODE_COMMAND: &str = "/pxc/bin/mysqld --defaults-extra-file=/etc/my.cnf --basedir=/pxc --user=mysql --skip-grant-tables --query_cache_type=0 --wsrep_slave_threads=16 --innodb_autoinc_lock_mode=2 --query_cache_size=0 --innodb_flush_log_at_trx_commit=0 --innodb_file_per_table";

/// Node name for a 1-based sequence index
pub fn node_name(index: usize) -> String {
    format!("{NODE_PREFIX}{index}")
}

/// Node fault injection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultSettings {
    /// Pause between the start of the second benchmark and the first stop
    pub stop_after: Duration,
}

/// Complete configuration of one run
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub platform: String,
    pub node_count: usize,

    pub node_command: String,
    pub extra_command: String,
    pub provider_options: String,
    pub bootstrap_options: String,
    pub join_options: String,

    pub tarball_url: String,
    pub build_dir: PathBuf,
    pub skip_build: bool,

    pub probe_attempts: u32,
    pub probe_delay: Duration,
    pub probe_max_delay: Duration,
    pub proxy_timeout: Duration,
    pub join_timeout: Duration,
    pub run_deadline: Duration,

    pub workload: WorkloadSettings,
    pub sanity_checks: Vec<SanityCheck>,
    pub latency: Option<NetDelay>,
    pub interface: String,
    pub faults: Option<FaultSettings>,

    pub report_path: Option<PathBuf>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            platform: "centos7-64".to_string(),
            node_count: 3,
            node_command: DEFAULT_NODE_COMMAND.to_string(),
            extra_command: "--wsrep-sst-method=rsync --core-file".to_string(),
            provider_options: "evs.auto_evict=3; evs.version=1; gcache.size=256M".to_string(),
            bootstrap_options: "--wsrep-new-cluster".to_string(),
            join_options: String::new(),
            tarball_url: DEFAULT_TARBALL_URL.to_string(),
            build_dir: PathBuf::from("docker"),
            skip_build: false,
            probe_attempts: 10,
            probe_delay: Duration::from_secs(1),
            probe_max_delay: Duration::from_secs(8),
            proxy_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(600),
            run_deadline: Duration::from_secs(3600),
            workload: WorkloadSettings::default(),
            sanity_checks: SanityCheck::defaults(),
            latency: Some(NetDelay::millis(3)),
            interface: "eth0".to_string(),
            faults: Some(FaultSettings {
                stop_after: Duration::from_secs(30),
            }),
            report_path: None,
        }
    }
}

impl ClusterConfig {
    /// Tag of the node image built for this platform
    pub fn image_tag(&self) -> String {
        format!("{IMAGE_REPO}:tarball-{}", self.platform)
    }

    /// Command-line pattern identifying stray node processes from earlier runs
    pub fn node_process_pattern(&self) -> &str {
        self.node_command.split_whitespace().next().unwrap_or("mysqld")
    }

    pub fn validate(&self) -> ClusterResult<()> {
        if self.node_count == 0 || self.node_count > MAX_NODES {
            return Err(ClusterError::config(
                "node_count",
                format!("must be between 1 and {MAX_NODES}, got {}", self.node_count),
            ));
        }
        if self.probe_attempts == 0 {
            return Err(ClusterError::config("probe_attempts", "must be at least 1"));
        }
        if self.probe_max_delay < self.probe_delay {
            return Err(ClusterError::config(
                "probe_max_delay",
                "must not be shorter than the initial probe delay",
            ));
        }
        if self.workload.threads == 0 {
            return Err(ClusterError::config("threads", "must be at least 1"));
        }
        if self.platform.trim().is_empty() {
            return Err(ClusterError::config("platform", "must not be empty"));
        }
        if self.interface.trim().is_empty() {
            return Err(ClusterError::config("interface", "must not be empty"));
        }
        Ok(())
    }
}
