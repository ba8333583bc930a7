//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthTokens;
use crate::domain::user::SignUpRequest;
use crate::domain::UserView;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SignUpResponse {
    pub user: UserView,
    /// Confirmation token, normally delivered by the mailer. Surfaced in
    /// the response until an email channel is wired up.
    pub confirmation_token: String,
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<SignUpResponse>)> {
    let (account, confirmation_token) = state.auth.sign_up(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user: UserView::from(&account),
            confirmation_token,
        }),
    ))
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<Json<AuthTokens>> {
    let tokens = state.auth.sign_in(&request.email, &request.password).await?;
    Ok(Json(tokens))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<AuthTokens>> {
    let tokens = state.auth.refresh(&request.refresh_token).await?;
    Ok(Json(tokens))
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub token: String,
}

pub async fn confirm_email(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> ApiResult<Json<UserView>> {
    let account = state.auth.confirm(&request.token).await?;
    Ok(Json(UserView::from(&account)))
}
