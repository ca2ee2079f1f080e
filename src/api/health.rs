use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::db::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub docker: &'static str,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (status, docker) = match state.manager.runtime().ping().await {
        Ok(()) => ("healthy", "connected"),
        Err(e) => {
            warn!("Runtime health check failed: {}", e);
            ("unhealthy", "disconnected")
        }
    };

    Json(HealthResponse { status, docker })
}
