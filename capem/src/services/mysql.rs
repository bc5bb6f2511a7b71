//! MySQL client tools: readiness ping and status queries

use async_trait::async_trait;
use shared::Endpoint;
use std::path::Path;

use super::shell::{argv, ShellRunner};
use crate::error::ClusterResult;
use crate::traits::{ReadinessCheck, SqlProbe};

/// `mysqladmin ping` against a published endpoint
#[derive(Debug, Clone, Default)]
pub struct MysqlAdmin {
    shell: ShellRunner,
}

impl MysqlAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ping_args(endpoint: &Endpoint) -> Vec<String> {
        let port = endpoint.port.to_string();
        argv(&["-h", &endpoint.host, "-P", &port, "-u", "root", "ping"])
    }
}

#[async_trait]
impl ReadinessCheck for MysqlAdmin {
    async fn ping(&self, endpoint: &Endpoint) -> bool {
        self.shell.succeeds("mysqladmin", &Self::ping_args(endpoint)).await
    }
}

/// `mysql` client talking through a node's rendezvous socket
#[derive(Debug, Clone, Default)]
pub struct MysqlClient {
    shell: ShellRunner,
}

impl MysqlClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_args(sql: &str, socket: &Path) -> Vec<String> {
        let socket = socket.display().to_string();
        argv(&["-nNE", "-S", &socket, "-u", "root", "-e", sql])
    }
}

/// Last non-empty line of vertical `mysql` output
pub fn last_value(output: &str) -> String {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl SqlProbe for MysqlClient {
    async fn query(&self, sql: &str, socket: &Path) -> ClusterResult<String> {
        let out = self
            .shell
            .run(
                "mysql",
                &Self::query_args(sql, socket),
                &format!("Failed to run {sql} on {}", socket.display()),
            )
            .await?;
        Ok(last_value(&out))
    }
}
