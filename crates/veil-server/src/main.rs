//! Veil — reversible text anonymization server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use veil_core::VeilConfig;

mod routes;
mod sessions;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("VEIL_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = VeilConfig::from_env(resolve_data_dir())?;
    let port = config.port;
    info!(
        detector = %config.detector,
        data_dir = %config.data_paths.root.display(),
        "Starting Veil"
    );

    let state = Arc::new(AppState::new(config)?);
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
