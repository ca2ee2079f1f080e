use axum::{
    extract::{FromRequest, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::engine::{supported_engines, EngineDescriptor};
use crate::db::instance::{CreatedDatabase, DatabaseSummary, ProvisionRequest};
use crate::db::manager::InstanceManager;
use crate::error::{AppError, Result};

/// JSON body extractor whose rejections use the service's error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Absent and `null` fields both count as missing and are rejected by validation
#[derive(Debug, Deserialize)]
pub struct CreateDbRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub dbname: Option<String>,
}

impl From<CreateDbRequest> for ProvisionRequest {
    fn from(req: CreateDbRequest) -> Self {
        Self {
            kind: req.kind.unwrap_or_default(),
            username: req.username.unwrap_or_default(),
            password: req.password.unwrap_or_default(),
            dbname: req.dbname.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub image: &'static str,
    pub internal_port: u16,
}

impl From<&EngineDescriptor> for EngineInfo {
    fn from(engine: &EngineDescriptor) -> Self {
        Self {
            kind: engine.kind.as_str(),
            image: engine.image,
            internal_port: engine.internal_port,
        }
    }
}

pub struct AppState {
    pub manager: Arc<InstanceManager>,
}

pub async fn create_db(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateDbRequest>,
) -> Result<(StatusCode, Json<CreatedDatabase>)> {
    let request = ProvisionRequest::from(req);
    let created = state.manager.create_database(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_dbs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<DatabaseSummary>>> {
    Ok(Json(state.manager.list_databases().await?))
}

pub async fn delete_db(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.manager.delete_database(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_engines() -> Json<Vec<EngineInfo>> {
    Json(supported_engines().iter().map(EngineInfo::from).collect())
}
