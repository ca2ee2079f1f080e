use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::manager::InstanceManager;

use super::db::{create_db, delete_db, list_dbs, list_engines, AppState};
use super::health::health_check;

pub fn create_router(manager: Arc<InstanceManager>) -> Router {
    let app_state = Arc::new(AppState { manager });

    Router::new()
        .route("/create-db", post(create_db))
        .route("/databases", get(list_dbs))
        .route("/database/{id}", delete(delete_db))
        .route("/engines", get(list_engines))
        .route("/health", get(health_check))
        .with_state(app_state)
        // The form is served from another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
