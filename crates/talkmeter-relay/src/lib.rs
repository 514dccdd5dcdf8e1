//! Telemetry relay: a WebSocket broadcast hub for conversation metrics.
//!
//! Publishers (the agent process running the metrics engine) and dashboard
//! subscribers connect to the same endpoint. `metrics_update` and
//! `log_message` frames are rebroadcast verbatim to every other connected
//! client; the publisher never hears its own echo. Delivery is best-effort
//! and at-most-once.

pub mod api_ws;
pub mod config;
pub mod hub;

use axum::{routing::get, Extension, Json, Router};
use hub::RelayHub;
use serde_json::{json, Value};
use std::{future::Future, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Default capacity of each subscriber's outbound queue.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Subscriber registry.
    pub hub: RelayHub,
    /// Capacity of each subscriber's outbound queue.
    pub outbound_buffer: usize,
}

impl AppState {
    pub fn new(hub: RelayHub) -> Self {
        Self {
            hub,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// Health check handler.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "client_count": state.hub.client_count().await,
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(api_ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}

/// Serves the relay on `listener` until `shutdown` resolves.
///
/// When the shutdown future completes, every subscriber session is closed
/// before the server stops accepting connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let hub = state.hub.clone();
    let shutdown = async move {
        shutdown.await;
        hub.close_all().await;
    };

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
