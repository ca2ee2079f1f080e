use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{
    ContainerInspectResponse, ContainerSummary, HostConfig, PortBinding, RestartPolicy,
    RestartPolicyNameEnum,
};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};

use super::{ContainerRecord, ContainerRuntime, ContainerSpec, InspectedContainer};

/// Docker Engine client, shared by every request for the life of the process
pub struct DockerManager {
    docker: Docker,
    stop_timeout: Duration,
}

impl DockerManager {
    /// Connect using `DOCKER_HOST` if set, the local socket otherwise
    pub fn new(stop_timeout: Duration) -> Result<Self> {
        let docker =
            Docker::connect_with_defaults().map_err(|e| AppError::runtime("connect", e))?;
        Ok(Self {
            docker,
            stop_timeout,
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerManager {
    async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| AppError::runtime("ping", e))?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ContainerRecord>> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| AppError::runtime("list", e))?;

        debug!("Runtime reported {} containers", containers.len());

        Ok(containers.into_iter().filter_map(record_from_summary).collect())
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(AppError::runtime("inspect image", e)),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        info!("Pulling image: {}", image);

        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);

        while let Some(result) = stream.next().await {
            let pull_failed = |cause: String| AppError::PullFailed {
                image: image.to_string(),
                cause,
            };

            match result {
                Ok(info) => {
                    if let Some(error) = info.error {
                        return Err(pull_failed(error));
                    }
                    if let Some(status) = info.status {
                        debug!("Pull status: {}", status);
                    }
                }
                Err(e) => return Err(pull_failed(e.to_string())),
            }
        }

        info!("Image pulled successfully: {}", image);
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let options = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(|e| AppError::runtime("create", e))?;

        for warning in &response.warnings {
            warn!("Runtime warning for {}: {}", spec.name, warning);
        }

        info!("Created container: {} ({})", spec.name, response.id);
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| AppError::runtime("start", e))?;

        info!("Started container: {}", id);
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<InspectedContainer> {
        let inspect = self
            .docker
            .inspect_container(id, None)
            .await
            .map_err(|e| AppError::runtime("inspect", e))?;

        Ok(inspected_from_response(id, inspect))
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        info!("Stopping container: {}", id);

        let options = StopContainerOptions {
            t: i64::try_from(self.stop_timeout.as_secs()).unwrap_or(i64::MAX),
        };

        match self.docker.stop_container(id, Some(options)).await {
            Ok(_) => {
                info!("Stopped container: {}", id);
                Ok(())
            }
            Err(DockerError::DockerResponseServerError {
                status_code: 304, ..
            }) => {
                warn!("Container {} was already stopped", id);
                Ok(())
            }
            Err(e) => Err(AppError::runtime("stop", e)),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        info!("Removing container: {}", id);

        // Named data volumes outlive the container
        let options = RemoveContainerOptions {
            force: false,
            v: false,
            ..Default::default()
        };

        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| AppError::runtime("remove", e))?;

        info!("Removed container: {}", id);
        Ok(())
    }
}

/// Translate a `ContainerSpec` into the runtime's create payload
fn container_config(spec: &ContainerSpec) -> Config<String> {
    let port_key = spec.port_key();

    let mut port_bindings = HashMap::new();
    port_bindings.insert(
        port_key.clone(),
        Some(vec![PortBinding {
            host_ip: spec.publish_host_ip.clone(),
            host_port: Some("0".to_string()), // Let Docker assign a port
        }]),
    );

    let host_config = HostConfig {
        port_bindings: Some(port_bindings),
        binds: Some(vec![spec.bind()]),
        restart_policy: Some(RestartPolicy {
            name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
            maximum_retry_count: None,
        }),
        memory: spec.memory_mb.and_then(memory_bytes),
        nano_cpus: spec.cpus.map(|cpus| (cpus * 1_000_000_000.0) as i64),
        ..Default::default()
    };

    let mut exposed_ports = HashMap::new();
    exposed_ports.insert(port_key, HashMap::new());

    Config {
        image: Some(spec.image.clone()),
        env: Some(spec.env.clone()),
        exposed_ports: Some(exposed_ports),
        host_config: Some(host_config),
        labels: Some(spec.labels.clone()),
        ..Default::default()
    }
}

/// Memory cap in bytes, `None` if it does not fit the runtime's field
fn memory_bytes(mb: u64) -> Option<i64> {
    mb.checked_mul(1024 * 1024)
        .and_then(|bytes| i64::try_from(bytes).ok())
}

fn record_from_summary(summary: ContainerSummary) -> Option<ContainerRecord> {
    let Some(id) = summary.id else {
        debug!(
            "Skipping runtime record without an id (names: {:?})",
            summary.names
        );
        return None;
    };
    let names = summary
        .names
        .unwrap_or_default()
        .into_iter()
        .map(|name| name.trim_start_matches('/').to_string())
        .collect();

    Some(ContainerRecord {
        id,
        names,
        image: summary.image.unwrap_or_default(),
        state: summary.state.unwrap_or_default(),
        status: summary.status.unwrap_or_default(),
    })
}

fn inspected_from_response(id: &str, inspect: ContainerInspectResponse) -> InspectedContainer {
    let port_bindings = inspect
        .network_settings
        .and_then(|ns| ns.ports)
        .unwrap_or_default()
        .into_iter()
        .map(|(key, bindings)| {
            let host_ports = bindings
                .unwrap_or_default()
                .into_iter()
                .filter_map(|binding| binding.host_port)
                .collect();
            (key, host_ports)
        })
        .collect();

    let (state, running) = match inspect.state {
        Some(state) => (
            state.status.map(|s| s.to_string()),
            state.running.unwrap_or(false),
        ),
        None => (None, false),
    };

    InspectedContainer {
        id: inspect.id.unwrap_or_else(|| id.to_string()),
        state,
        running,
        port_bindings,
    }
}
