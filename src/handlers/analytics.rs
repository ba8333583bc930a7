//! Dashboard analytics handlers

use axum::{extract::State, Json};

use crate::domain::money::{MonthlyComparison, RevenueSummary};
use crate::domain::UserLog;
use crate::engine::LoanCounts;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedPrincipal;
use crate::state::AppState;

pub async fn revenue(
    State(state): State<AppState>,
    AuthenticatedPrincipal(_principal): AuthenticatedPrincipal,
) -> ApiResult<Json<RevenueSummary>> {
    Ok(Json(state.engine.revenue().await?))
}

pub async fn monthly(
    State(state): State<AppState>,
    AuthenticatedPrincipal(_principal): AuthenticatedPrincipal,
) -> ApiResult<Json<MonthlyComparison>> {
    Ok(Json(state.engine.month_over_month().await?))
}

pub async fn dashboard(
    State(state): State<AppState>,
    AuthenticatedPrincipal(_principal): AuthenticatedPrincipal,
) -> ApiResult<Json<LoanCounts>> {
    Ok(Json(state.engine.counts().await?))
}

/// Recent audit entries. Admin only.
pub async fn activity(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> ApiResult<Json<Vec<UserLog>>> {
    if !principal.is_admin() {
        return Err(ApiError::Authorization(
            "viewing the audit log requires the admin role".to_string(),
        ));
    }
    let entries = state.audit.entries().await.map_err(ApiError::from)?;
    Ok(Json(entries))
}
