//! HTTP server setup and routing
//!
//! Every handler locks the engine mutex for the duration of its operation,
//! so engine mutations never interleave.

use crate::error::{Error, Result};
use crate::playback::engine::PlayerEngine;
use axum::{
    routing::{get, post},
    Router,
};
use cloude_common::events::EventBus;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<Mutex<PlayerEngine>>,
    pub events: EventBus,
}

impl AppContext {
    pub fn new(engine: Arc<Mutex<PlayerEngine>>, events: EventBus) -> Self {
        Self { engine, events }
    }
}

/// Router with every control endpoint
pub fn build_router(ctx: AppContext) -> Router {
    use super::handlers;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/build_info", get(handlers::build_info))
        // Transport
        .route("/playback/state", get(handlers::get_state))
        .route("/playback/toggle", post(handlers::toggle))
        .route("/playback/next", post(handlers::next))
        .route("/playback/previous", post(handlers::previous))
        .route("/playback/seek", post(handlers::seek))
        .route("/playback/queue/:index", post(handlers::play_queue_entry))
        // Library
        .route("/library", get(handlers::get_library))
        .route("/library/:index/play", post(handlers::play_library_entry))
        .route("/albums/play", post(handlers::play_album))
        // Output and effects
        .route("/audio/volume", get(handlers::get_volume).post(handlers::set_volume))
        .route("/effects", get(handlers::get_effects).post(handlers::update_effects))
        .route("/modes", post(handlers::update_modes))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API on `port` until `shutdown` resolves
pub async fn run<F>(ctx: AppContext, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
