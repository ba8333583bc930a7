//! Append-only audit records
//!
//! Written on every state-changing action, never mutated or deleted. Audit
//! writes are best-effort: a failed write is logged and must not fail the
//! operation it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    LoanSubmitted,
    LoanApproved,
    LoanRejected,
    LoanReconciled,
    LoanSettled,
    DocumentsAttached,
    UserSignedUp,
    UserSignedIn,
    UserUpdated,
    UserRoleChanged,
    UserConfirmed,
    UserDeleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLog {
    pub id: Uuid,
    /// Acting user, if the action was performed by an authenticated
    /// principal. Anonymous submissions leave this unset.
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub description: String,
    pub device: Option<String>,
    pub created_at: DateTime<Utc>,
}
