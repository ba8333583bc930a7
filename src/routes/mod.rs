//! Route definitions for the KasiLend API

mod analytics;
mod auth;
mod loans;
mod stokvela;
mod users;

pub use analytics::analytics_routes;
pub use auth::auth_routes;
pub use loans::loan_routes;
pub use stokvela::stokvela_routes;
pub use users::user_routes;

use axum::{middleware::from_fn, routing::get, Router};

use crate::handlers;
use crate::middleware::{request_tracing, security_headers};
use crate::state::AppState;

/// Assemble the full API router. Shared by the binary and the
/// integration tests.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .merge(loan_routes())
        .merge(auth_routes())
        .merge(user_routes())
        .merge(stokvela_routes())
        .merge(analytics_routes())
        .layer(from_fn(security_headers))
        .layer(from_fn(request_tracing))
        .with_state(state)
}
