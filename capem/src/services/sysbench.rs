//! sysbench driven workload generator

use async_trait::async_trait;
use shared::{cluster_info, LogScope};

use super::shell::ShellRunner;
use crate::core::workload::{WorkloadInvocation, WorkloadPhase};
use crate::error::ClusterResult;
use crate::traits::WorkloadGenerator;

pub struct Sysbench {
    program: String,
    shell: ShellRunner,
}

impl Sysbench {
    pub fn new() -> Self {
        Self::with_program("sysbench")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            shell: ShellRunner::new(),
        }
    }
}

impl Default for Sysbench {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkloadGenerator for Sysbench {
    async fn run(&self, invocation: &WorkloadInvocation) -> ClusterResult<()> {
        let failure = match invocation.phase {
            WorkloadPhase::Prepare => "Failed to run sysbench to load data".to_string(),
            WorkloadPhase::Benchmark { .. } => format!("Failed to run {} test", invocation.settings.test_name),
        };
        cluster_info!(
            LogScope::Orchestrator,
            "🏋️ Starting {}: {}",
            invocation.phase,
            invocation.command_line(&self.program)
        );
        self.shell
            .passthrough(&self.program, &invocation.args(), &failure)
            .await
    }
}
