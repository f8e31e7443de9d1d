use crate::{ServerConfig, SignalingService, ws_handler};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::info;

pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(service)
}

async fn health(State(service): State<SignalingService>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": service.registry().connection_count(),
        "rooms": service.directory().room_count(),
    }))
}

/// Binds `config.bind_addr` and serves until the process is stopped.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    serve_on(listener, SignalingService::new(&config)).await
}

pub async fn serve_on(listener: TcpListener, service: SignalingService) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Signaling server listening on ws://{}/ws", addr);

    axum::serve(listener, router(service))
        .await
        .context("Signaling server stopped")?;
    Ok(())
}
