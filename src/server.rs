// ==============================================================================
// local status endpoint
// ==============================================================================
// the upload loop writes into SharedStatus, the handlers here only read it.
// lets an operator check the replay without opening the hosted dashboard.

use anyhow::Result;
use axum::{extract::State, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::domain::{SharedStatus, UploadStatus};

pub fn router(status: SharedStatus) -> Router {
    Router::new()
        .route("/api", get(api_handler))
        .route("/api/current", get(current_handler))
        .layer(CorsLayer::permissive())
        .with_state(status)
}

pub async fn serve(bind: &str, status: SharedStatus) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, router(status)).await?;
    Ok(())
}

/// counters, latest record and metadata
pub async fn api_handler(State(status): State<SharedStatus>) -> Json<UploadStatus> {
    let status = status.read().await;
    Json(status.clone())
}

/// latest record only; `null` before the first successful upload
pub async fn current_handler(State(status): State<SharedStatus>) -> Json<serde_json::Value> {
    let status = status.read().await;
    Json(serde_json::to_value(&status.current).unwrap_or(serde_json::Value::Null))
}
