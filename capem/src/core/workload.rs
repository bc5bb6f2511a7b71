//! Workload invocations
//!
//! The load generator is an external binary; this module only describes what
//! one phase asks of it and renders the command line.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Parameters shared by every workload phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSettings {
    /// Directory holding the test scripts
    pub script_dir: String,
    /// Test name, with or without a trailing `.lua`
    pub test_name: String,
    /// Auto-increment mode passed to the generator
    pub auto_inc: String,
    pub threads: u32,
    pub table_size: u32,
    pub table_count: u32,
    pub duration_secs: u64,
    pub index_updates: u32,
    pub non_index_updates: u32,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            script_dir: "/pxc56/db".to_string(),
            test_name: "oltp".to_string(),
            auto_inc: "off".to_string(),
            threads: 8,
            table_size: 500,
            table_count: 8,
            duration_secs: 300,
            index_updates: 15,
            non_index_updates: 15,
        }
    }
}

impl WorkloadSettings {
    fn script(&self, name: &str) -> String {
        format!("{}/{}.lua", self.script_dir.trim_end_matches('/'), name)
    }

    fn test_script(&self) -> String {
        let name = self.test_name.strip_suffix(".lua").unwrap_or(&self.test_name);
        self.script(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum WorkloadPhase {
    /// Parallel table creation and initial data load
    Prepare,
    /// Timed benchmark; round 2 runs alongside node stopping
    Benchmark { round: u8 },
}

impl fmt::Display for WorkloadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadPhase::Prepare => write!(f, "prepare"),
            WorkloadPhase::Benchmark { round } => write!(f, "benchmark #{round}"),
        }
    }
}

/// One call into the load generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadInvocation {
    pub phase: WorkloadPhase,
    pub sockets: Vec<PathBuf>,
    pub settings: WorkloadSettings,
}

impl WorkloadInvocation {
    pub fn prepare(socket: PathBuf, settings: &WorkloadSettings) -> Self {
        Self {
            phase: WorkloadPhase::Prepare,
            sockets: vec![socket],
            settings: settings.clone(),
        }
    }

    pub fn benchmark(round: u8, sockets: Vec<PathBuf>, settings: &WorkloadSettings) -> Self {
        Self {
            phase: WorkloadPhase::Benchmark { round },
            sockets,
            settings: settings.clone(),
        }
    }

    /// Comma separated rendezvous paths
    pub fn socket_list(&self) -> String {
        self.sockets
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Program arguments for the generator
    pub fn args(&self) -> Vec<String> {
        let s = &self.settings;
        match self.phase {
            WorkloadPhase::Prepare => vec![
                format!("--test={}", s.script("parallel_prepare")),
                "--report-interval=10".to_string(),
                format!("--oltp-auto-inc={}", s.auto_inc),
                "--mysql-db=test".to_string(),
                "--db-driver=mysql".to_string(),
                format!("--num-threads={}", s.threads),
                "--mysql-engine-trx=yes".to_string(),
                "--mysql-table-engine=innodb".to_string(),
                format!("--mysql-socket={}", self.socket_list()),
                "--mysql-user=root".to_string(),
                format!("--oltp-table-size={}", s.table_size),
                format!("--oltp_tables_count={}", s.table_count),
                "prepare".to_string(),
            ],
            WorkloadPhase::Benchmark { .. } => vec![
                format!("--test={}", s.test_script()),
                "--db-driver=mysql".to_string(),
                "--mysql-db=test".to_string(),
                "--mysql-engine-trx=yes".to_string(),
                "--mysql-table-engine=innodb".to_string(),
                format!("--mysql-socket={}", self.socket_list()),
                "--mysql-user=root".to_string(),
                format!("--num-threads={}", s.threads),
                "--init-rng=on".to_string(),
                "--max-requests=1870000000".to_string(),
                format!("--max-time={}", s.duration_secs),
                format!("--oltp_index_updates={}", s.index_updates),
                format!("--oltp_non_index_updates={}", s.non_index_updates),
                format!("--oltp-auto-inc={}", s.auto_inc),
                "--oltp_distinct_ranges=15".to_string(),
                "--report-interval=1".to_string(),
                format!("--oltp_tables_count={}", s.table_count),
                "run".to_string(),
            ],
        }
    }

    pub fn command_line(&self, program: &str) -> String {
        std::iter::once(program.to_string())
            .chain(self.args())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
