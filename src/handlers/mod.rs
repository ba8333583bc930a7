//! API handlers

pub mod analytics;
pub mod auth;
pub mod loans;
pub mod stokvela;
pub mod users;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

pub async fn root() -> &'static str {
    "KasiLend API Server"
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    store: String,
    version: String,
}

/// Health check endpoint. Pings the collection store with a cheap count.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = match state.engine.counts().await {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };
    let status = if store == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };
    Json(HealthResponse {
        status: status.to_string(),
        store,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
