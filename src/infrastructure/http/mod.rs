pub mod request_id;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::controllers::{health, narration::NarrationController};
use crate::domain::workspace::WorkspaceManager;
use crate::infrastructure::config::Config;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

/// Build the application router with all routes configured
pub fn build_router(
    workspaces: Arc<WorkspaceManager>,
    narration_controller: Arc<NarrationController>,
    max_upload_bytes: usize,
) -> Router {
    let narration_routes = Router::new()
        .route("/api/narrations", post(NarrationController::synthesize))
        .route(
            "/api/narrations/:id",
            get(NarrationController::metadata).delete(NarrationController::cleanup),
        )
        .route("/api/narrations/:id/play", get(NarrationController::play))
        .route("/api/narrations/:id/download", get(NarrationController::download))
        .route("/api/voices", get(NarrationController::voices))
        .with_state(narration_controller)
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(workspaces)
        .merge(narration_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_id_middleware)),
        )
}

/// Start the HTTP server
pub async fn start_http_server(config: Arc<Config>, app: Router) -> anyhow::Result<()> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
