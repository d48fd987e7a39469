use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use narrator::controllers::narration::NarrationController;
use narrator::domain::narration::{NarrationService, TokioTimer, VoiceCatalog};
use narrator::domain::workspace::WorkspaceManager;
use narrator::infrastructure::audio::codec_for;
use narrator::infrastructure::config::{Config, LogFormat};
use narrator::infrastructure::http::{build_router, start_http_server};
use narrator::infrastructure::repositories::GoogleTtsRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting Narrator on {}:{}",
        config.host,
        config.port
    );
    tracing::info!(
        environment = ?config.environment,
        encoding = config.audio_encoding.as_str(),
        chunk_max_chars = config.chunk_max_chars,
        chunk_max_bytes = config.chunk_max_bytes,
        merge_block_size = config.merge_block_size,
        synthesis_delay_ms = config.synthesis_delay_ms,
        workspace_root = %config.workspace_root.display(),
        "Narration pipeline configured"
    );

    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Workspaces
    let workspaces = Arc::new(WorkspaceManager::new(
        config.workspace_root.clone(),
        config.workspace_ttl(),
    ));
    if let Err(e) = workspaces.check_storage().await {
        tracing::warn!(error = %e, "Workspace root is not writable, audio will be kept in memory");
    }
    spawn_lease_sweeper(workspaces.clone(), config.workspace_sweep_interval());

    // 2. Instantiate repositories
    tracing::info!("Instantiating repositories...");
    let tts_repo = Arc::new(GoogleTtsRepository::new(
        config.google_tts_endpoint.clone(),
        config.google_tts_api_key.clone(),
    ));

    // 3. Instantiate services (inject repositories and codecs)
    tracing::info!("Instantiating services...");
    let voices = VoiceCatalog::new(&config.voices);
    tracing::info!(voices = voices.voices().len(), "Voice catalog loaded");
    let narration_service = Arc::new(NarrationService::new(
        workspaces.clone(),
        tts_repo,
        codec_for(config.audio_encoding),
        Arc::new(TokioTimer),
        voices,
        config.narration_settings(),
    ));

    // 4. Instantiate controllers (inject services)
    tracing::info!("Instantiating controllers...");
    let narration_controller = Arc::new(NarrationController::new(narration_service));

    // Start HTTP server with all routes
    let app = build_router(workspaces, narration_controller, config.max_upload_bytes);
    start_http_server(config, app).await?;

    Ok(())
}

/// Periodically expire idle workspaces and purge their storage
fn spawn_lease_sweeper(workspaces: Arc<WorkspaceManager>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            workspaces.sweep().await;
            tracing::debug!(live = workspaces.live_count(), "Workspace leases swept");
        }
    });
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "narrator=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "narrator=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
