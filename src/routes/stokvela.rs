//! Stokvela schedule routes

use axum::{routing::get, Router};

use crate::handlers::stokvela;
use crate::state::AppState;

pub fn stokvela_routes() -> Router<AppState> {
    Router::new().route("/api/stokvela/members", get(stokvela::list_members))
}
