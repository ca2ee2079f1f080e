use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::db::naming::VolumeScope;

/// When the image for an engine is pulled before creating a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    /// Pull before every create, even if the image is already present
    Always,
    /// Pull only when the runtime does not have the image locally
    Missing,
}

impl FromStr for PullPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "missing" => Ok(Self::Missing),
            other => Err(format!("unknown pull policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,

    /// Host written into connection strings handed back to callers
    pub public_host: String,
    /// Host interface the runtime binds published ports on; unset binds every address family
    pub publish_host_ip: Option<String>,

    // Optional per-container resource caps
    pub container_memory_mb: Option<u64>,
    pub container_cpus: Option<f64>,

    pub pull_policy: PullPolicy,
    pub volume_scope: VolumeScope,
    pub stop_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 4000,
            public_host: "localhost".to_string(),
            publish_host_ip: None,
            container_memory_mb: None,
            container_cpus: None,
            pull_policy: PullPolicy::Always,
            volume_scope: VolumeScope::Shared,
            stop_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: parsed("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            public_host: env::var("PUBLIC_HOST").unwrap_or(defaults.public_host),
            publish_host_ip: env::var("PUBLISH_HOST_IP")
                .ok()
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty())
                .or(defaults.publish_host_ip),
            container_memory_mb: parsed::<u64>("CONTAINER_MEMORY_MB")
                .filter(|mb| valid_memory_mb(*mb)),
            container_cpus: parsed::<f64>("CONTAINER_CPUS").filter(|cpus| *cpus > 0.0),
            pull_policy: parsed("PULL_POLICY").unwrap_or(defaults.pull_policy),
            volume_scope: parsed("VOLUME_SCOPE").unwrap_or(defaults.volume_scope),
            stop_timeout: parsed::<u64>("STOP_TIMEOUT_SECS")
                .filter(|secs| i64::try_from(*secs).is_ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.stop_timeout),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Largest cap whose byte count still fits the runtime's signed 64-bit field
const MAX_MEMORY_MB: u64 = (i64::MAX as u64) / (1024 * 1024);

fn valid_memory_mb(mb: u64) -> bool {
    mb > 0 && mb <= MAX_MEMORY_MB
}

/// Read and parse an environment variable, ignoring unset or malformed values
fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
