use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bar_leaderboard::config::{DataSources, ServerConfig, parse_path_arg};
use bar_leaderboard::data_manager::DataManager;
use bar_leaderboard::http::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = ServerConfig::from_env()?;
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if let Some(dir) = parse_path_arg(&args, "--data-dir") {
        config.sources = DataSources::in_dir(dir);
    }

    // The bulk load is blocking file IO and CPU work; nothing is served until it finishes.
    let sources = config.sources.clone();
    let manager = tokio::task::spawn_blocking(move || DataManager::load_all(sources))
        .await
        .context("data load task failed")?
        .context("required data could not be loaded")?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        reload_enabled = config.query.allow_reload,
        max_page_size = config.query.max_page_size,
        "configuration loaded"
    );
    http::serve(listener, AppState::new(Arc::new(manager), config.query)).await
}
