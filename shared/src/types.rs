//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

/// Host/port pair reachable from the orchestrator's machine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SharedError::InvalidEndpoint { input: s.to_string() };
        let (host, port) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(Self::new(host, port))
    }
}

/// Time unit accepted by the netem queuing discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayUnit {
    Micros,
    Millis,
    Seconds,
}

impl DelayUnit {
    fn suffix(&self) -> &'static str {
        match self {
            DelayUnit::Micros => "us",
            DelayUnit::Millis => "ms",
            DelayUnit::Seconds => "s",
        }
    }
}

/// Fixed egress latency, written the way `tc netem delay` expects it (e.g. `3ms`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDelay {
    pub amount: u32,
    pub unit: DelayUnit,
}

impl NetDelay {
    pub fn millis(amount: u32) -> Self {
        Self {
            amount,
            unit: DelayUnit::Millis,
        }
    }
}

impl fmt::Display for NetDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for NetDelay {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let split = input
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(input.len());
        let (digits, suffix) = input.split_at(split);

        let invalid = || SharedError::InvalidDelay { input: s.to_string() };
        let amount = digits.parse::<u32>().map_err(|_| invalid())?;
        let unit = match suffix {
            "us" => DelayUnit::Micros,
            "ms" | "" => DelayUnit::Millis,
            "s" => DelayUnit::Seconds,
            _ => return Err(invalid()),
        };

        Ok(Self { amount, unit })
    }
}

/// Where a log line originates from within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogScope {
    /// The control task driving the run
    Orchestrator,
    /// A cluster member or infrastructure environment
    Node(String),
    /// A background rendezvous bridge for a node
    Proxy(String),
    /// Fault injection
    Fault,
    /// Teardown
    Reaper,
}

impl fmt::Display for LogScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogScope::Orchestrator => write!(f, "orchestrator"),
            LogScope::Node(name) => write!(f, "node:{name}"),
            LogScope::Proxy(name) => write!(f, "proxy:{name}"),
            LogScope::Fault => write!(f, "fault"),
            LogScope::Reaper => write!(f, "reaper"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse_and_display() {
        let endpoint: Endpoint = "0.0.0.0:32768".parse().unwrap();
        assert_eq!(endpoint.host, "0.0.0.0");
        assert_eq!(endpoint.port, 32768);
        assert_eq!(endpoint.to_string(), "0.0.0.0:32768");
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        assert!("no-port".parse::<Endpoint>().is_err());
        assert!(":3306".parse::<Endpoint>().is_err());
        assert!("host:99999".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_net_delay_units() {
        assert_eq!("3ms".parse::<NetDelay>().unwrap(), NetDelay::millis(3));
        assert_eq!("250us".parse::<NetDelay>().unwrap().to_string(), "250us");
        assert_eq!("2s".parse::<NetDelay>().unwrap().to_string(), "2s");
        // Bare numbers are milliseconds
        assert_eq!("7".parse::<NetDelay>().unwrap().to_string(), "7ms");
    }

    #[test]
    fn test_net_delay_rejects_unknown_unit() {
        assert_eq!(
            "3min".parse::<NetDelay>(),
            Err(SharedError::InvalidDelay {
                input: "3min".to_string()
            })
        );
        assert!("ms".parse::<NetDelay>().is_err());
    }

    #[test]
    fn test_log_scope_display() {
        assert_eq!(LogScope::Orchestrator.to_string(), "orchestrator");
        assert_eq!(LogScope::Node("Dock2".into()).to_string(), "node:Dock2");
        assert_eq!(LogScope::Proxy("Dock2".into()).to_string(), "proxy:Dock2");
    }
}
