//! User account routes

use axum::{
    routing::{delete, get, patch, put},
    Router,
};

use crate::handlers::users;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(users::me))
        .route("/api/users", get(users::list_users))
        .route("/api/users/:id", get(users::get_user))
        .route("/api/users/:id", patch(users::update_profile))
        .route("/api/users/:id", delete(users::delete_user))
        .route("/api/users/:id/role", put(users::set_role))
        .route("/api/users/:id/confirmed", put(users::set_confirmed))
}
