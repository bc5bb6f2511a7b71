//! Declarative launch specifications for isolated environments

use std::fmt;
use std::path::Path;

use crate::config::{ClusterConfig, HOSTS_MOUNT, INFRA_IMAGE, INFRA_NAME};

/// Options handed to the environment runner when starting an environment
///
/// Rendered as the flat option string that follows `docker run`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchSpec {
    pub name: String,
    pub hostname: Option<String>,
    pub image: String,
    pub publish_all: bool,
    pub env: Vec<(String, String)>,
    pub volumes: Vec<(String, String)>,
    pub dns: Option<String>,
    pub entry: Option<String>,
}

impl LaunchSpec {
    /// Name-resolution helper serving the run's hosts file
    pub fn infrastructure(hosts_file: &Path) -> Self {
        Self {
            name: INFRA_NAME.to_string(),
            image: INFRA_IMAGE.to_string(),
            env: vec![("SST_SYSLOG_TAG".to_string(), "dnsmasq".to_string())],
            volumes: vec![
                ("/dev/log".to_string(), "/dev/log".to_string()),
                (hosts_file.display().to_string(), HOSTS_MOUNT.to_string()),
            ],
            ..Default::default()
        }
    }

    /// Cluster member `name`; `bootstrap` picks between the new-cluster and join options
    pub fn node(config: &ClusterConfig, name: &str, bootstrap: bool, dns: Option<&str>) -> Self {
        let role_options = if bootstrap {
            config.bootstrap_options.as_str()
        } else {
            config.join_options.as_str()
        };

        let mut command = format!(
            "ulimit -c unlimited && {} {} --wsrep-provider-options='{}'",
            config.node_command.trim(),
            config.extra_command.trim(),
            config.provider_options
        );
        if !role_options.trim().is_empty() {
            command.push(' ');
            command.push_str(role_options.trim());
        }

        Self {
            name: name.to_string(),
            hostname: Some(name.to_string()),
            image: config.image_tag(),
            publish_all: true,
            env: vec![("SST_SYSLOG_TAG".to_string(), name.to_string())],
            volumes: vec![("/dev/log".to_string(), "/dev/log".to_string())],
            dns: dns.map(str::to_string),
            entry: Some(format!("bash -c \"{command}\"")),
        }
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-d -i")?;
        if self.publish_all {
            write!(f, " -P")?;
        }
        write!(f, " --name {}", self.name)?;
        if let Some(hostname) = &self.hostname {
            write!(f, " -h {hostname}")?;
        }
        for (key, value) in &self.env {
            write!(f, " -e {key}={value}")?;
        }
        for (host, container) in &self.volumes {
            write!(f, " -v {host}:{container}")?;
        }
        if let Some(dns) = &self.dns {
            write!(f, " --dns {dns}")?;
        }
        write!(f, " {}", self.image)?;
        if let Some(entry) = &self.entry {
            write!(f, " {entry}")?;
        }
        Ok(())
    }
}
