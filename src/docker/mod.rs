mod container;
#[cfg(test)]
mod memory;

pub use container::DockerManager;
#[cfg(test)]
pub use memory::MemoryRuntime;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

/// A container as reported by the runtime's list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub id: String,
    /// Names without the runtime's leading `/`
    pub names: Vec<String>,
    pub image: String,
    pub state: String,
    pub status: String,
}

impl ContainerRecord {
    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Everything needed to create one database container.
///
/// The runtime picks the host port and the container always restarts unless
/// explicitly stopped.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<String>,
    pub internal_port: u16,
    /// `None` lets the runtime bind every host address
    pub publish_host_ip: Option<String>,
    pub volume_name: String,
    pub volume_mount_path: String,
    pub memory_mb: Option<u64>,
    pub cpus: Option<f64>,
    pub labels: HashMap<String, String>,
}

impl ContainerSpec {
    pub fn port_key(&self) -> String {
        format!("{}/tcp", self.internal_port)
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.volume_name, self.volume_mount_path)
    }
}

/// Result of inspecting a single container
#[derive(Debug, Clone, Default)]
pub struct InspectedContainer {
    pub id: String,
    pub state: Option<String>,
    pub running: bool,
    /// Published host ports keyed by `{port}/tcp`
    pub port_bindings: HashMap<String, Vec<String>>,
}

impl InspectedContainer {
    /// First host port bound to the given internal port, if published yet
    pub fn host_port(&self, internal_port: u16) -> Option<u16> {
        self.port_bindings
            .get(&format!("{}/tcp", internal_port))?
            .iter()
            .find_map(|port| port.parse::<u16>().ok())
    }
}

/// Control surface of the container runtime.
///
/// Every failure comes back classified, as `AppError::Runtime` (or
/// `AppError::PullFailed` for pulls). Nothing here retries.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// All containers, including stopped ones
    async fn list_all(&self) -> Result<Vec<ContainerRecord>>;

    async fn image_exists(&self, image: &str) -> Result<bool>;

    /// Pull an image, returning once every layer has completed
    async fn pull_image(&self, image: &str) -> Result<()>;

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Returns once the runtime has started the container, not once the
    /// database inside accepts connections
    async fn start_container(&self, id: &str) -> Result<()>;

    async fn inspect_container(&self, id: &str) -> Result<InspectedContainer>;

    async fn stop_container(&self, id: &str) -> Result<()>;

    async fn remove_container(&self, id: &str) -> Result<()>;
}
