pub mod api;
pub mod config;
pub mod core_state;
pub mod history;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Initialize logging, build the service state and serve until shutdown.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Local development convenience; production injects real env vars
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = config::AppConfig::from_env();
    let core = Arc::new(core_state::CoreState::new(&app_config)?);
    core.initialize_backend(&app_config);

    if app_config.api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty, every request to /api will be rejected");
    }

    let router = api::api_router(core, &app_config);
    let listener = tokio::net::TcpListener::bind(&app_config.bind_addr).await?;
    tracing::info!(addr = %app_config.bind_addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
