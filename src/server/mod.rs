//! HTTP/WebSocket transport
//!
//! Thin `axum` glue around the Controller: a single `GET /ws/transcribe-stream`
//! upgrade endpoint. Everything state-machine-shaped lives in
//! [`crate::session::Controller`]; this module only wires the wire protocol
//! to the socket.

pub mod ws;

use crate::asr::AsrInvoker;
use crate::config::Config;
use crate::registry::SharedRegistry;
use crate::text::{HiraganaNormalizer, Translator};
use crate::worker_pool::WorkerPool;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: SharedRegistry,
    pub asr: Arc<dyn AsrInvoker>,
    pub hiragana: Arc<HiraganaNormalizer>,
    pub translator: Arc<dyn Translator>,
    pub worker_pool: Arc<WorkerPool>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/transcribe-stream", get(ws::transcribe_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
