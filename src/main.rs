mod api;
mod config;
mod db;
mod docker;
mod error;

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::create_router;
use crate::config::Config;
use crate::db::InstanceManager;
use crate::docker::{ContainerRuntime, DockerManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "db_provisioner=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    // One runtime client for the whole process
    let docker = DockerManager::new(config.stop_timeout).context("Failed to connect to Docker")?;
    docker
        .ping()
        .await
        .context("Failed to reach Docker daemon")?;
    info!("Connected to Docker daemon");

    let manager = Arc::new(InstanceManager::new(Arc::new(docker), config.clone()));

    let app = create_router(manager);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
