//! HTTP server for health checks, metrics, the latest frame and selection control

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, Registry, TextEncoder};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::control::SelectionControl;
use crate::error::Result;
use crate::pipeline::DashboardFrame;
use crate::scheduler::FrameStore;
use crate::venues::{Selection, VenueConfig};

/// State shared with HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<FrameStore>,
    pub registry: Registry,
    pub control: Arc<SelectionControl>,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/frame", get(latest_frame))
        .route("/venues", get(list_venues))
        .route("/venues/:id/toggle", post(toggle_venue))
        .route("/symbol/:symbol", post(set_symbol))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to `port` on all interfaces and serve until the listener fails
pub async fn serve(state: HttpState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn health_check(State(state): State<HttpState>) -> Json<serde_json::Value> {
    let latest = state.store.latest().await;
    Json(serde_json::json!({
        "status": "healthy",
        "component": "depth-analytics",
        "epoch": state.store.epoch().await,
        "last_tick": latest.as_ref().map(|f| f.tick),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn metrics(State(state): State<HttpState>) -> std::result::Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.registry.gather(), &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn latest_frame(
    State(state): State<HttpState>,
) -> std::result::Result<Json<DashboardFrame>, StatusCode> {
    state
        .store
        .latest()
        .await
        .map(|frame| Json(frame.as_ref().clone()))
        .ok_or(StatusCode::NO_CONTENT)
}

async fn list_venues(State(state): State<HttpState>) -> Json<Vec<VenueConfig>> {
    Json(state.control.venues().await)
}

async fn toggle_venue(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<VenueConfig>, StatusCode> {
    state
        .control
        .toggle_venue(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn set_symbol(
    State(state): State<HttpState>,
    Path(symbol): Path<String>,
) -> std::result::Result<Json<Selection>, StatusCode> {
    state.control.set_symbol(&symbol).await.map(Json).map_err(|e| {
        warn!(error = %e, "Rejected symbol change");
        StatusCode::BAD_REQUEST
    })
}
