//! Loan lifecycle routes

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::handlers::loans;
use crate::state::AppState;

// Two documents at up to 5 MB each plus the JSON part; the axum default
// of 2 MB is too small for a full submission.
const MAX_SUBMISSION_BYTES: usize = 12 * 1024 * 1024;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans", post(loans::submit_application))
        .route("/api/loans/pending", get(loans::list_pending))
        .route("/api/loans/approved", get(loans::list_approved))
        .route("/api/loans/rejected", get(loans::list_rejected))
        .route("/api/loans/preview", get(loans::preview_return))
        .route("/api/loans/:id", get(loans::get_loan))
        .route("/api/loans/:id/documents", post(loans::attach_documents))
        .route("/api/loans/:id/approve", post(loans::approve_loan))
        .route("/api/loans/:id/reject", post(loans::reject_loan))
        .route("/api/loans/:id/reconcile", post(loans::reconcile_loan))
        .route("/api/loans/:id/settle", post(loans::settle_loan))
        .layer(DefaultBodyLimit::max(MAX_SUBMISSION_BYTES))
}
