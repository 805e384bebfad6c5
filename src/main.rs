mod asr;
mod config;
mod error;
mod provider;
mod routes;
mod state;
mod summarize;
mod translate;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medtalk_gateway=debug,tower_http=debug".into()),
        )
        .init();

    let config_path = Config::locate()?;
    let config = Config::load(config_path.as_deref())?;
    match &config_path {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("No configuration file found, using defaults and environment"),
    }

    if config.provider_config.api_key.trim().is_empty() {
        warn!("OPENAI_API_KEY is not set; upstream calls will be rejected by the provider");
    }
    info!("Prompt templates version {}", config.prompt_config.version);

    std::fs::create_dir_all(&config.system_config.upload_dir).with_context(|| {
        format!(
            "Failed to create upload directory {}",
            config.system_config.upload_dir
        )
    })?;

    let addr = format!("{}:{}", config.system_config.host, config.system_config.port);
    let app_state = AppState::new(config)?;
    let app = routes::build_app(app_state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
