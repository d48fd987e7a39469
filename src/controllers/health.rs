use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use crate::domain::workspace::WorkspaceManager;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn health_ready(State(workspaces): State<Arc<WorkspaceManager>>) -> impl IntoResponse {
    match workspaces.check_storage().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "storage": "writable",
                "workspaces": workspaces.live_count()
            })),
        ),
        Err(e) => {
            tracing::warn!(
                error = %e,
                root = %workspaces.root().display(),
                "Workspace root is not writable"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "storage": "unavailable",
                    "workspaces": workspaces.live_count()
                })),
            )
        }
    }
}
