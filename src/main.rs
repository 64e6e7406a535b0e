//! `cte-server` binary entry point.

use cte::config::Config;
use cte::registry::Registry;
use cte::server::{build_router, AppState};
use cte::text::{HiraganaNormalizer, NoopTranslator};
use cte::worker_pool::WorkerPool;
use cte::asr;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    asr::initialize(&config).await?;

    let state = AppState {
        registry: Arc::new(Registry::new(&config)),
        asr: asr::get_service(),
        hiragana: Arc::new(HiraganaNormalizer::new()),
        translator: Arc::new(NoopTranslator),
        worker_pool: Arc::new(WorkerPool::new(config.worker_pool_permits)),
        config: Arc::new(config.clone()),
    };

    let addr: SocketAddr = std::env::var("CTE_LISTEN_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

    tracing::info!(%addr, "cte-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
