use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{Config, PullPolicy};
use crate::docker::{ContainerRuntime, ContainerSpec};
use crate::error::{AppError, Result};

use super::connection::connection_string;
use super::engine::{get_engine, EngineDescriptor};
use super::instance::{CreatedDatabase, DatabaseSummary, ProvisionRequest};
use super::naming::{container_name, volume_name, RandomSuffix, SuffixGenerator};

/// Provisions, lists and deletes database containers.
///
/// Holds no instance state of its own: every operation re-reads the runtime.
pub struct InstanceManager {
    runtime: Arc<dyn ContainerRuntime>,
    suffixes: Arc<dyn SuffixGenerator>,
    config: Config,
}

impl InstanceManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: Config) -> Self {
        Self::with_suffixes(runtime, Arc::new(RandomSuffix), config)
    }

    pub fn with_suffixes(
        runtime: Arc<dyn ContainerRuntime>,
        suffixes: Arc<dyn SuffixGenerator>,
        config: Config,
    ) -> Self {
        Self {
            runtime,
            suffixes,
            config,
        }
    }

    pub fn runtime(&self) -> Arc<dyn ContainerRuntime> {
        self.runtime.clone()
    }

    /// Create and start a new database container
    pub async fn create_database(&self, request: &ProvisionRequest) -> Result<CreatedDatabase> {
        request.validate()?;
        let engine = get_engine(&request.kind)?;

        self.provision(engine, request).await.inspect_err(|e| {
            if e.is_infrastructure() {
                error!("Failed to provision {} database: {}", engine.kind, e);
            } else {
                info!("Rejected {} database request: {}", engine.kind, e);
            }
        })
    }

    async fn provision(
        &self,
        engine: &'static EngineDescriptor,
        request: &ProvisionRequest,
    ) -> Result<CreatedDatabase> {
        let suffix = self.suffixes.suffix();
        let name = container_name(engine.kind, &request.dbname, &suffix);
        let volume = volume_name(self.config.volume_scope, engine.kind, &request.dbname, &name);

        // Not atomic with the create below; a concurrent create can still win
        let existing = self.runtime.list_all().await?;
        if existing.iter().any(|record| record.has_name(&name)) {
            return Err(AppError::NameConflict(name));
        }

        self.ensure_image(engine.image).await?;

        let spec = ContainerSpec {
            name: name.clone(),
            image: engine.image.to_string(),
            env: engine.build_env(&request.username, &request.password, &request.dbname),
            internal_port: engine.internal_port,
            publish_host_ip: self.config.publish_host_ip.clone(),
            volume_name: volume.clone(),
            volume_mount_path: engine.volume_mount_path.to_string(),
            memory_mb: self.config.container_memory_mb,
            cpus: self.config.container_cpus,
            labels: HashMap::from([
                ("db-provisioner.kind".to_string(), engine.kind.to_string()),
                ("db-provisioner.dbname".to_string(), request.dbname.clone()),
                ("db-provisioner.volume".to_string(), volume.clone()),
            ]),
        };

        info!(
            "Creating {} container {} with volume {}",
            engine.kind, name, volume
        );

        let id = self.runtime.create_container(&spec).await?;
        self.runtime.start_container(&id).await?;

        let inspected = self.runtime.inspect_container(&id).await?;
        if !inspected.running {
            warn!(
                "Container {} is {} right after start",
                inspected.id,
                inspected.state.as_deref().unwrap_or("in an unknown state")
            );
        }
        let host_port = inspected.host_port(engine.internal_port);

        let connection = match host_port {
            Some(port) => {
                info!("Container {} mapped to host port {}", name, port);
                Some(connection_string(
                    engine.kind,
                    &request.username,
                    &request.password,
                    &request.dbname,
                    &self.config.public_host,
                    port,
                ))
            }
            None => {
                warn!(
                    "Container {} has no published port for {} yet",
                    name,
                    engine.port_key()
                );
                None
            }
        };

        Ok(CreatedDatabase {
            id,
            name,
            kind: engine.kind,
            connection_string: connection,
            host_port,
            volume_name: volume,
            created_at: Utc::now(),
        })
    }

    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.config.pull_policy == PullPolicy::Missing && self.runtime.image_exists(image).await? {
            debug!("Image {} already present, skipping pull", image);
            return Ok(());
        }
        self.runtime.pull_image(image).await
    }

    /// Every container the runtime knows about, ours or not
    pub async fn list_databases(&self) -> Result<Vec<DatabaseSummary>> {
        let records = self.runtime.list_all().await.inspect_err(|e| {
            error!("Failed to list containers: {}", e);
        })?;

        Ok(records.into_iter().map(DatabaseSummary::from).collect())
    }

    /// Stop then remove a container
    pub async fn delete_database(&self, id: &str) -> Result<()> {
        let delete_failed = |e: AppError| {
            error!("Failed to delete container {}: {}", id, e);
            AppError::DeleteFailed {
                id: id.to_string(),
                cause: e.to_string(),
            }
        };

        self.runtime.stop_container(id).await.map_err(delete_failed)?;
        self.runtime.remove_container(id).await.map_err(delete_failed)?;

        info!("Deleted container {}", id);
        Ok(())
    }
}
