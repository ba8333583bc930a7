//! Loan lifecycle handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::money;
use crate::domain::{
    ApprovedLoan, DocumentKind, DocumentUpload, LoanApplication, LoanDraft, LoanRecord,
    RejectedLoan,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedPrincipal;
use crate::state::AppState;

/// Submit a new application. Multipart: an `application` JSON part plus
/// file parts named `id_document`, `bank_statement` and optionally
/// `proof_of_income`.
pub async fn submit_application(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<LoanApplication>)> {
    let (draft, documents) = read_parts(&mut multipart).await?;
    let draft =
        draft.ok_or_else(|| ApiError::BadRequest("missing 'application' part".to_string()))?;
    let application = state.engine.submit(draft, documents).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// Retry document upload against an existing pending application.
pub async fn attach_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<LoanApplication>> {
    let (_, documents) = read_parts(&mut multipart).await?;
    let application = state.engine.attach_documents(id, documents).await?;
    Ok(Json(application))
}

async fn read_parts(
    multipart: &mut Multipart,
) -> ApiResult<(Option<LoanDraft>, Vec<DocumentUpload>)> {
    let mut draft = None;
    let mut documents = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "application" {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            draft = Some(serde_json::from_str(&text).map_err(|e| {
                ApiError::BadRequest(format!("invalid application JSON: {}", e))
            })?);
        } else if let Some(kind) = DocumentKind::from_field(&name) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            documents.push(DocumentUpload {
                kind,
                content_type,
                bytes: bytes.to_vec(),
            });
        }
    }
    Ok((draft, documents))
}

pub async fn list_pending(State(state): State<AppState>) -> ApiResult<Json<Vec<LoanApplication>>> {
    Ok(Json(state.engine.pending().await?))
}

pub async fn list_approved(State(state): State<AppState>) -> ApiResult<Json<Vec<ApprovedLoan>>> {
    Ok(Json(state.engine.approved().await?))
}

pub async fn list_rejected(State(state): State<AppState>) -> ApiResult<Json<Vec<RejectedLoan>>> {
    Ok(Json(state.engine.rejected().await?))
}

pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LoanRecord>> {
    Ok(Json(state.engine.find(id).await?))
}

pub async fn approve_loan(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApprovedLoan>> {
    Ok(Json(state.engine.approve(id, &principal).await?))
}

pub async fn reject_loan(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RejectedLoan>> {
    Ok(Json(state.engine.reject(id, &principal).await?))
}

#[derive(Serialize)]
pub struct ReconcileResponse {
    pub removed: bool,
}

/// Delete-only retry after a reported partial transition.
pub async fn reconcile_loan(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReconcileResponse>> {
    let removed = state.engine.reconcile(id, &principal).await?;
    Ok(Json(ReconcileResponse { removed }))
}

pub async fn settle_loan(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApprovedLoan>> {
    Ok(Json(state.engine.settle(id, &principal).await?))
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    pub amount: Decimal,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub amount: Decimal,
    pub total_return: Decimal,
    pub formatted: String,
}

/// Preview the total return for an amount, using the same computation the
/// engine persists at approval.
pub async fn preview_return(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<PreviewResponse>> {
    let total_return = state.engine.preview_return(query.amount)?;
    Ok(Json(PreviewResponse {
        amount: query.amount,
        total_return,
        formatted: money::format_rand(total_return),
    }))
}
