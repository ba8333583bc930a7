//! User account handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::user::ProfileUpdate;
use crate::domain::{UserRole, UserView};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedPrincipal;
use crate::state::AppState;

pub async fn me(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> ApiResult<Json<UserView>> {
    let account = state.users.get(principal.id).await?;
    Ok(Json(UserView::from(&account)))
}

pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> ApiResult<Json<Vec<UserView>>> {
    let accounts = state.users.list(&principal).await?;
    Ok(Json(accounts.iter().map(UserView::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserView>> {
    if principal.id != id && !principal.is_admin() {
        return Err(ApiError::Authorization(
            "only the account holder or an admin may view this account".to_string(),
        ));
    }
    let account = state.users.get(id).await?;
    Ok(Json(UserView::from(&account)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<UserView>> {
    let account = state.users.update_profile(id, &principal, update).await?;
    Ok(Json(UserView::from(&account)))
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

pub async fn set_role(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(request): Json<SetRoleRequest>,
) -> ApiResult<Json<UserView>> {
    let account = state.users.set_role(id, request.role, &principal).await?;
    Ok(Json(UserView::from(&account)))
}

#[derive(Deserialize)]
pub struct SetConfirmedRequest {
    pub confirmed: bool,
}

pub async fn set_confirmed(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(request): Json<SetConfirmedRequest>,
) -> ApiResult<Json<UserView>> {
    let account = state
        .users
        .set_confirmed(id, request.confirmed, &principal)
        .await?;
    Ok(Json(UserView::from(&account)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.users.delete(id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}
