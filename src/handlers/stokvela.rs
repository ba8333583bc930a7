//! Stokvela schedule handlers

use axum::{extract::State, Json};

use crate::domain::StokvelaMember;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list_members(State(state): State<AppState>) -> ApiResult<Json<Vec<StokvelaMember>>> {
    let members = state.stokvela.members().await.map_err(ApiError::from)?;
    Ok(Json(members))
}
