//! Builder for orchestrators wired to the recording fakes

use capem::core::WorkloadInvocation;
use capem::{ClusterConfig, ClusterOrchestrator, ClusterServices, FaultSettings};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::fakes::{
    EventLog, FakeEnvironment, FakeImages, FakeLauncher, FakeReadiness, FakeShaper, FakeSql, FakeWorkload,
};
use super::fixtures::TestFixtures;

/// Builds a [`ClusterOrchestrator`] whose collaborators all record into one [`EventLog`]
pub struct ClusterHarness {
    config: ClusterConfig,
    log: EventLog,
    unreachable: HashSet<u16>,
    hanging: HashSet<u16>,
    sql_overrides: HashMap<String, String>,
    fail_start: Option<String>,
    stall_start: Option<String>,
    benchmark_time: Duration,
    invocations: Arc<Mutex<Vec<WorkloadInvocation>>>,
}

impl ClusterHarness {
    pub fn new(node_count: usize) -> Self {
        Self {
            config: TestFixtures::config(node_count),
            log: EventLog::default(),
            unreachable: HashSet::new(),
            hanging: HashSet::new(),
            sql_overrides: HashMap::new(),
            fail_start: None,
            stall_start: None,
            benchmark_time: Duration::ZERO,
            invocations: Arc::default(),
        }
    }

    /// Node `name` never answers readiness probes
    pub fn with_unreachable(mut self, name: &str) -> Self {
        self.unreachable.insert(TestFixtures::port_of(name));
        self
    }

    /// Readiness pings to node `name` never return
    pub fn with_hanging_ping(mut self, name: &str) -> Self {
        self.hanging.insert(TestFixtures::port_of(name));
        self
    }

    /// Every node reports `value` for status variable `variable`
    pub fn with_sql_value(mut self, variable: &str, value: &str) -> Self {
        self.sql_overrides.insert(variable.to_string(), value.to_string());
        self
    }

    pub fn with_faults(mut self, faults: FaultSettings) -> Self {
        self.config.faults = Some(faults);
        self
    }

    pub fn with_failing_start(mut self, name: &str) -> Self {
        self.fail_start = Some(name.to_string());
        self
    }

    /// Starting `name` never completes
    pub fn with_stalled_start(mut self, name: &str) -> Self {
        self.stall_start = Some(name.to_string());
        self
    }

    /// Each benchmark run takes this long
    pub fn with_benchmark_time(mut self, duration: Duration) -> Self {
        self.benchmark_time = duration;
        self
    }

    pub fn with_run_deadline(mut self, deadline: Duration) -> Self {
        self.config.run_deadline = deadline;
        self
    }

    pub fn with_config<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut ClusterConfig),
    {
        setup(&mut self.config);
        self
    }

    /// Shared record of every workload call made by the built orchestrator
    pub fn invocations(&self) -> Arc<Mutex<Vec<WorkloadInvocation>>> {
        self.invocations.clone()
    }

    pub fn build(self) -> (ClusterOrchestrator, EventLog) {
        let log = self.log;
        let services = ClusterServices {
            environment: Arc::new(FakeEnvironment {
                log: log.clone(),
                fail_start: self.fail_start,
                stall_start: self.stall_start,
            }),
            images: Arc::new(FakeImages { log: log.clone() }),
            readiness: Arc::new(FakeReadiness {
                unreachable: self.unreachable,
                hanging: self.hanging,
            }),
            sql: Arc::new(FakeSql {
                log: log.clone(),
                overrides: self.sql_overrides,
            }),
            workload: Arc::new(FakeWorkload {
                log: log.clone(),
                benchmark_time: self.benchmark_time,
                invocations: self.invocations,
            }),
            shaper: Arc::new(FakeShaper { log: log.clone() }),
            launcher: Arc::new(FakeLauncher { log: log.clone() }),
        };

        let orchestrator = ClusterOrchestrator::new(self.config, services).expect("test configuration is valid");
        (orchestrator, log)
    }
}

/// Assertion shortcuts over the event log
pub struct TestHelpers;

impl TestHelpers {
    /// Environments stopped, in order, by fault injection and teardown alike
    pub fn stops(log: &EventLog) -> Vec<String> {
        log.with_prefix("stop:")
    }

    pub fn starts(log: &EventLog) -> Vec<String> {
        log.with_prefix("start:")
    }

    pub fn workload_phases(log: &EventLog) -> Vec<String> {
        log.with_prefix("workload:")
    }

    /// Panics unless `first` was recorded before `second`
    pub fn assert_before(log: &EventLog, first: &str, second: &str) {
        let a = log.position(first).unwrap_or_else(|| panic!("{first} never happened: {:?}", log.all()));
        let b = log.position(second).unwrap_or_else(|| panic!("{second} never happened: {:?}", log.all()));
        assert!(a < b, "expected {first} before {second}: {:?}", log.all());
    }

    pub fn socket_counts(invocations: &Arc<Mutex<Vec<WorkloadInvocation>>>) -> Vec<(String, usize)> {
        invocations
            .lock()
            .unwrap()
            .iter()
            .map(|i| (i.phase.to_string(), i.sockets.len()))
            .collect()
    }
}
