//! Dashboard analytics routes

use axum::{routing::get, Router};

use crate::handlers::analytics;
use crate::state::AppState;

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analytics/revenue", get(analytics::revenue))
        .route("/api/analytics/monthly", get(analytics::monthly))
        .route("/api/analytics/dashboard", get(analytics::dashboard))
        .route("/api/analytics/activity", get(analytics::activity))
}
