//! Hosts mapping served by the name-resolution helper

use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::config::HOSTS_DOMAIN;
use crate::error::ClusterResult;

#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
}

impl HostsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines mapping both the short and the qualified name of `name` to `ip`
    pub fn entry(name: &str, ip: &str) -> String {
        format!("{ip} {name}\n{ip} {name}.{HOSTS_DOMAIN}\n")
    }

    pub async fn append(&self, name: &str, ip: &str) -> ClusterResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        file.write_all(Self::entry(name, ip).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
