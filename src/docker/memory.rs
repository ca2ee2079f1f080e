use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::{AppError, Result};

use super::{ContainerRecord, ContainerRuntime, ContainerSpec, InspectedContainer};

#[derive(Debug, Clone)]
struct MemoryContainer {
    id: String,
    spec: ContainerSpec,
    running: bool,
    host_port: u16,
}

#[derive(Default)]
struct State {
    containers: Vec<MemoryContainer>,
    images: HashSet<String>,
    calls: Vec<String>,
    failing: HashSet<&'static str>,
    next_id: u32,
    next_port: u16,
    unpublished: bool,
}

/// In-process stand-in for the container runtime.
///
/// Records every call, hands out sequential host ports starting at 49153
/// and rejects duplicate names the way Docker does.
#[derive(Default)]
pub struct MemoryRuntime {
    state: Mutex<State>,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail
    pub fn fail_on(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.insert(operation);
    }

    /// Report no published ports on inspect
    pub fn withhold_ports(&self) {
        self.state.lock().unwrap().unpublished = true;
    }

    pub fn add_image(&self, image: &str) {
        self.state.lock().unwrap().images.insert(image.to_string());
    }

    /// Seed a container that this service did not create
    pub fn add_foreign(&self, name: &str, image: &str) -> String {
        let spec = ContainerSpec {
            name: name.to_string(),
            image: image.to_string(),
            env: Vec::new(),
            internal_port: 6379,
            publish_host_ip: None,
            volume_name: String::new(),
            volume_mount_path: String::new(),
            memory_mb: None,
            cpus: None,
            labels: HashMap::new(),
        };
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id();
        state.containers.push(MemoryContainer {
            id: id.clone(),
            spec,
            running: true,
            host_port: 0,
        });
        id
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn spec_of(&self, id: &str) -> Option<ContainerSpec> {
        let state = self.state.lock().unwrap();
        state.find(id).map(|c| c.spec.clone())
    }

    fn enter(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation.to_string());
        if state.failing.contains(operation) {
            return Err(AppError::runtime(operation, "injected failure"));
        }
        Ok(state)
    }
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:012x}", self.next_id)
    }

    fn find(&self, id: &str) -> Option<&MemoryContainer> {
        self.containers.iter().find(|c| c.id == id)
    }

    fn find_mut(&mut self, id: &str, operation: &'static str) -> Result<&mut MemoryContainer> {
        self.containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::runtime(operation, format!("No such container: {}", id)))
    }
}

#[async_trait]
impl ContainerRuntime for MemoryRuntime {
    async fn ping(&self) -> Result<()> {
        self.enter("ping").map(|_| ())
    }

    async fn list_all(&self) -> Result<Vec<ContainerRecord>> {
        let state = self.enter("list")?;
        Ok(state
            .containers
            .iter()
            .map(|c| ContainerRecord {
                id: c.id.clone(),
                names: vec![c.spec.name.clone()],
                image: c.spec.image.clone(),
                state: if c.running { "running" } else { "exited" }.to_string(),
                status: if c.running { "Up" } else { "Exited (0)" }.to_string(),
            })
            .collect())
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        let state = self.enter("image_exists")?;
        Ok(state.images.contains(image))
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("pull".to_string());
        if state.failing.contains("pull") {
            return Err(AppError::PullFailed {
                image: image.to_string(),
                cause: "layer download failed".to_string(),
            });
        }
        state.images.insert(image.to_string());
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let mut state = self.enter("create")?;
        if state.containers.iter().any(|c| c.spec.name == spec.name) {
            return Err(AppError::runtime(
                "create",
                format!("Conflict. The container name \"/{}\" is already in use", spec.name),
            ));
        }
        if !state.images.contains(&spec.image) {
            return Err(AppError::runtime("create", format!("No such image: {}", spec.image)));
        }

        let id = state.allocate_id();
        state.containers.push(MemoryContainer {
            id: id.clone(),
            spec: spec.clone(),
            running: false,
            host_port: 0,
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        let mut state = self.enter("start")?;
        state.next_port = state.next_port.max(49152) + 1;
        let port = state.next_port;
        let container = state.find_mut(id, "start")?;
        container.running = true;
        container.host_port = port;
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<InspectedContainer> {
        let state = self.enter("inspect")?;
        let unpublished = state.unpublished;
        let container = state
            .find(id)
            .ok_or_else(|| AppError::runtime("inspect", format!("No such container: {}", id)))?;

        let mut port_bindings = HashMap::new();
        if container.running && !unpublished {
            port_bindings.insert(
                container.spec.port_key(),
                vec![container.host_port.to_string()],
            );
        }

        Ok(InspectedContainer {
            id: container.id.clone(),
            state: Some(if container.running { "running" } else { "created" }.to_string()),
            running: container.running,
            port_bindings,
        })
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        let mut state = self.enter("stop")?;
        state.find_mut(id, "stop")?.running = false;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let mut state = self.enter("remove")?;
        if state.find_mut(id, "remove")?.running {
            return Err(AppError::runtime(
                "remove",
                format!("You cannot remove a running container {}", id),
            ));
        }
        state.containers.retain(|c| c.id != id);
        Ok(())
    }
}
