//! Loan lifecycle engine
//!
//! The state machine is pending -> approved | rejected, with both decided
//! states terminal. The three states are three collections; a decision
//! copies the record into the destination collection under the same id and
//! then deletes it from pending. The insert must complete before the delete
//! is attempted: reversed, a failed insert would leave the record in no
//! collection at all. Because the destination insert keeps the application
//! id, the second of two racing decisions hits a duplicate-key conflict
//! instead of double-inserting; an insert that lands but whose delete fails
//! is reported as a partial transition and recovered by retrying only the
//! delete.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::money::{self, MonthlyComparison, RevenueSummary};
use crate::domain::{
    ApprovedLoan, AuditAction, DocumentKind, DocumentUpload, LoanApplication, LoanDraft,
    LoanRecord, Principal, RejectedLoan,
};
use crate::services::AuditLog;
use crate::storage::{DocumentStore, StorageError, MAX_DOCUMENT_BYTES};
use crate::store::{collections, CollectionStore, Filter, Order, StoreError};

/// Engine failures, per lifecycle contract.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Authorization(String),

    #[error("no pending application with id {0}")]
    NotFound(Uuid),

    #[error("application {0} has already been decided")]
    AlreadyDecided(Uuid),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The pending record was created but its documents were not stored.
    /// The record persists without URLs; recovery is re-uploading against
    /// this id, not re-submitting.
    #[error("documents for application {id} were not stored: {reason}")]
    DocumentsNotStored { id: Uuid, reason: String },

    #[error("persistence failure: {0}")]
    Persistence(String),

    /// The decided copy exists but the pending record was not removed.
    /// Recovery is a delete-only reconcile, never a re-insert.
    #[error("loan {id} was copied to the {destination} collection but not removed from pending")]
    PartialTransition { id: Uuid, destination: &'static str },
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { id, .. } => EngineError::AlreadyDecided(id),
            StoreError::NotFound { id, .. } => EngineError::NotFound(id),
            other => EngineError::Persistence(other.to_string()),
        }
    }
}

fn field_error(field: &'static str, code: &'static str, message: &'static str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    errors.add(field, err);
    errors
}

/// Counts per lifecycle state, for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct LoanCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

pub struct LoanEngine {
    store: Arc<dyn CollectionStore>,
    documents: Arc<dyn DocumentStore>,
    audit: AuditLog,
    interest_rate: Decimal,
    bucket: String,
}

impl LoanEngine {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        documents: Arc<dyn DocumentStore>,
        audit: AuditLog,
        interest_rate: Decimal,
        bucket: String,
    ) -> Self {
        Self {
            store,
            documents,
            audit,
            interest_rate,
            bucket,
        }
    }

    fn ensure_admin(&self, principal: &Principal, operation: &str) -> Result<(), EngineError> {
        if !principal.is_admin() {
            return Err(EngineError::Authorization(format!(
                "{} requires the admin role",
                operation
            )));
        }
        Ok(())
    }

    /// Total owed on a principal amount at the engine's configured rate.
    /// The same computation is persisted at approval.
    pub fn preview_return(&self, amount: Decimal) -> Result<Decimal, EngineError> {
        if amount <= Decimal::ZERO {
            return Err(field_error("amount", "amount", "amount must be a positive number").into());
        }
        Ok(money::total_return(amount, self.interest_rate))
    }

    /// Submit a new application.
    ///
    /// Two phases: the pending record is inserted first so the document
    /// uploads can be keyed by its id, then the record is patched with the
    /// resulting URLs. If an upload or the patch fails the record already
    /// exists without URLs, and the error carries its id so the client can
    /// retry via [`attach_documents`].
    ///
    /// [`attach_documents`]: LoanEngine::attach_documents
    pub async fn submit(
        &self,
        draft: LoanDraft,
        documents: Vec<DocumentUpload>,
    ) -> Result<LoanApplication, EngineError> {
        draft.validate()?;
        Self::check_documents(&documents, true)?;

        let mut app = LoanApplication::from_draft(Uuid::new_v4(), draft, Utc::now());
        let data = serde_json::to_value(&app).map_err(|e| EngineError::Persistence(e.to_string()))?;
        self.store
            .insert(collections::LOAN_APPLICATIONS, Some(app.id), data)
            .await?;

        let urls = self
            .upload_documents(app.id, &documents)
            .await
            .map_err(|e| EngineError::DocumentsNotStored {
                id: app.id,
                reason: e.to_string(),
            })?;
        self.store
            .update(collections::LOAN_APPLICATIONS, app.id, urls.clone())
            .await
            .map_err(|e| EngineError::DocumentsNotStored {
                id: app.id,
                reason: e.to_string(),
            })?;
        Self::apply_urls(&mut app, &urls);

        self.audit
            .record(
                None,
                AuditAction::LoanSubmitted,
                format!(
                    "application {} submitted for {}",
                    app.id,
                    money::format_rand(app.amount)
                ),
                None,
            )
            .await;
        Ok(app)
    }

    /// Re-upload documents against an existing pending application.
    pub async fn attach_documents(
        &self,
        id: Uuid,
        documents: Vec<DocumentUpload>,
    ) -> Result<LoanApplication, EngineError> {
        Self::check_documents(&documents, false)?;
        let record = self
            .store
            .fetch(collections::LOAN_APPLICATIONS, id)
            .await?
            .ok_or(EngineError::NotFound(id))?;
        let mut app: LoanApplication = record.decode()?;

        let urls = self.upload_documents(id, &documents).await?;
        self.store
            .update(collections::LOAN_APPLICATIONS, id, urls.clone())
            .await?;
        Self::apply_urls(&mut app, &urls);

        self.audit
            .record(
                None,
                AuditAction::DocumentsAttached,
                format!("documents re-attached to application {}", id),
                None,
            )
            .await;
        Ok(app)
    }

    fn check_documents(documents: &[DocumentUpload], require_all: bool) -> Result<(), EngineError> {
        if require_all {
            for kind in [DocumentKind::IdDocument, DocumentKind::BankStatement] {
                if !documents.iter().any(|d| d.kind == kind) {
                    return Err(field_error(
                        "documents",
                        "required",
                        "an id document and a bank statement are required",
                    )
                    .into());
                }
            }
        } else if documents.is_empty() {
            return Err(
                field_error("documents", "required", "at least one document is required").into(),
            );
        }
        for doc in documents {
            if doc.bytes.is_empty() {
                return Err(field_error("documents", "empty", "document is empty").into());
            }
            if doc.bytes.len() > MAX_DOCUMENT_BYTES {
                return Err(
                    field_error("documents", "too_large", "documents are limited to 5 MB").into(),
                );
            }
        }
        Ok(())
    }

    async fn upload_documents(
        &self,
        id: Uuid,
        documents: &[DocumentUpload],
    ) -> Result<serde_json::Value, EngineError> {
        let mut urls = serde_json::Map::new();
        for doc in documents {
            let path = format!("{}/{}", id, doc.kind.as_str());
            let url = self
                .documents
                .upload(&self.bucket, &path, doc.bytes.clone(), &doc.content_type)
                .await?;
            urls.insert(doc.kind.url_field().to_string(), url.into());
        }
        Ok(serde_json::Value::Object(urls))
    }

    fn apply_urls(app: &mut LoanApplication, urls: &serde_json::Value) {
        let get = |field: &str| {
            urls.get(field)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };
        if let Some(url) = get("id_document_url") {
            app.id_document_url = Some(url);
        }
        if let Some(url) = get("proof_of_income_url") {
            app.proof_of_income_url = Some(url);
        }
        if let Some(url) = get("bank_statement_url") {
            app.bank_statement_url = Some(url);
        }
    }

    /// Approve a pending application. Admin only, checked before any store
    /// call.
    pub async fn approve(
        &self,
        id: Uuid,
        principal: &Principal,
    ) -> Result<ApprovedLoan, EngineError> {
        self.ensure_admin(principal, "approve")?;
        let app = self.take_pending(id).await?;
        let approved = ApprovedLoan::from_application(&app, Utc::now(), self.interest_rate);
        let data = serde_json::to_value(&approved)
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        self.store
            .insert(collections::APPROVED_LOANS, Some(id), data)
            .await?;
        self.finish_transition(id, "approved").await?;

        self.audit
            .record(
                Some(principal.id),
                AuditAction::LoanApproved,
                format!(
                    "loan {} approved, total return {}",
                    id,
                    money::format_rand(approved.total_return)
                ),
                None,
            )
            .await;
        Ok(approved)
    }

    /// Reject a pending application. Symmetric to approve, without the
    /// interest computation.
    pub async fn reject(
        &self,
        id: Uuid,
        principal: &Principal,
    ) -> Result<RejectedLoan, EngineError> {
        self.ensure_admin(principal, "reject")?;
        let app = self.take_pending(id).await?;
        let rejected = RejectedLoan::from_application(&app, Utc::now());
        let data = serde_json::to_value(&rejected)
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        self.store
            .insert(collections::REJECTED_LOANS, Some(id), data)
            .await?;
        self.finish_transition(id, "rejected").await?;

        self.audit
            .record(
                Some(principal.id),
                AuditAction::LoanRejected,
                format!("loan {} rejected", id),
                None,
            )
            .await;
        Ok(rejected)
    }

    async fn take_pending(&self, id: Uuid) -> Result<LoanApplication, EngineError> {
        match self.store.fetch(collections::LOAN_APPLICATIONS, id).await? {
            Some(record) => Ok(record.decode()?),
            None => {
                if self.is_decided(id).await? {
                    Err(EngineError::AlreadyDecided(id))
                } else {
                    Err(EngineError::NotFound(id))
                }
            }
        }
    }

    async fn is_decided(&self, id: Uuid) -> Result<bool, EngineError> {
        Ok(self
            .store
            .fetch(collections::APPROVED_LOANS, id)
            .await?
            .is_some()
            || self
                .store
                .fetch(collections::REJECTED_LOANS, id)
                .await?
                .is_some())
    }

    async fn finish_transition(&self, id: Uuid, destination: &'static str) -> Result<(), EngineError> {
        // delete-if-exists: a false return means a racing reconcile got
        // there first, which is fine.
        match self.store.delete(collections::LOAN_APPLICATIONS, id).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::error!(
                    loan_id = %id,
                    destination,
                    error = %e,
                    "decided copy inserted but pending delete failed"
                );
                Err(EngineError::PartialTransition { id, destination })
            }
        }
    }

    /// Delete-only retry for a reported partial transition. Returns whether
    /// a leftover pending record was actually removed.
    pub async fn reconcile(&self, id: Uuid, principal: &Principal) -> Result<bool, EngineError> {
        self.ensure_admin(principal, "reconcile")?;
        if !self.is_decided(id).await? {
            return Err(EngineError::NotFound(id));
        }
        let removed = self.store.delete(collections::LOAN_APPLICATIONS, id).await?;
        if removed {
            self.audit
                .record(
                    Some(principal.id),
                    AuditAction::LoanReconciled,
                    format!("stale pending copy of loan {} removed", id),
                    None,
                )
                .await;
        }
        Ok(removed)
    }

    /// Mark an approved loan as settled. Admin only.
    pub async fn settle(&self, id: Uuid, principal: &Principal) -> Result<ApprovedLoan, EngineError> {
        self.ensure_admin(principal, "settle")?;
        let record = self
            .store
            .fetch(collections::APPROVED_LOANS, id)
            .await?
            .ok_or(EngineError::NotFound(id))?;
        let mut loan: ApprovedLoan = record.decode()?;
        self.store
            .update(
                collections::APPROVED_LOANS,
                id,
                serde_json::json!({ "settled": true }),
            )
            .await?;
        loan.settled = true;

        self.audit
            .record(
                Some(principal.id),
                AuditAction::LoanSettled,
                format!("loan {} settled", id),
                None,
            )
            .await;
        Ok(loan)
    }

    pub async fn pending(&self) -> Result<Vec<LoanApplication>, EngineError> {
        self.list(collections::LOAN_APPLICATIONS).await
    }

    pub async fn approved(&self) -> Result<Vec<ApprovedLoan>, EngineError> {
        self.list(collections::APPROVED_LOANS).await
    }

    pub async fn rejected(&self) -> Result<Vec<RejectedLoan>, EngineError> {
        self.list(collections::REJECTED_LOANS).await
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<T>, EngineError> {
        let records = self
            .store
            .query(collection, &Filter::none(), Order::CreatedDesc)
            .await?;
        records
            .iter()
            .map(|r| r.decode().map_err(EngineError::from))
            .collect()
    }

    /// Find a loan in whichever lifecycle state it currently occupies.
    pub async fn find(&self, id: Uuid) -> Result<LoanRecord, EngineError> {
        if let Some(record) = self.store.fetch(collections::LOAN_APPLICATIONS, id).await? {
            return Ok(LoanRecord::Pending(record.decode()?));
        }
        if let Some(record) = self.store.fetch(collections::APPROVED_LOANS, id).await? {
            return Ok(LoanRecord::Approved(record.decode()?));
        }
        if let Some(record) = self.store.fetch(collections::REJECTED_LOANS, id).await? {
            return Ok(LoanRecord::Rejected(record.decode()?));
        }
        Err(EngineError::NotFound(id))
    }

    pub async fn counts(&self) -> Result<LoanCounts, EngineError> {
        Ok(LoanCounts {
            pending: self
                .store
                .count(collections::LOAN_APPLICATIONS, &Filter::none())
                .await?,
            approved: self
                .store
                .count(collections::APPROVED_LOANS, &Filter::none())
                .await?,
            rejected: self
                .store
                .count(collections::REJECTED_LOANS, &Filter::none())
                .await?,
        })
    }

    /// Totals over the whole approved book.
    pub async fn revenue(&self) -> Result<RevenueSummary, EngineError> {
        let approved = self.approved().await?;
        Ok(money::aggregate_revenue(&approved))
    }

    /// Total return of the current calendar month against the previous one.
    pub async fn month_over_month(&self) -> Result<MonthlyComparison, EngineError> {
        let approved = self.approved().await?;
        let now = Utc::now();
        let (current_year, current_month) = (now.year(), now.month());
        let (previous_year, previous_month) = if current_month == 1 {
            (current_year - 1, 12)
        } else {
            (current_year, current_month - 1)
        };

        let total_for = |year: i32, month: u32| {
            approved
                .iter()
                .filter(|l| l.decided_at.year() == year && l.decided_at.month() == month)
                .map(|l| l.total_return)
                .sum::<Decimal>()
        };
        let current = total_for(current_year, current_month);
        let previous = total_for(previous_year, previous_month);
        Ok(MonthlyComparison {
            current,
            previous,
            change_pct: money::month_compare(current, previous),
        })
    }
}
