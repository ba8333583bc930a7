//! Loan lifecycle integration tests over the in-memory store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use serde_json::Value;
use uuid::Uuid;

use kasilend_server::domain::money;
use kasilend_server::domain::{
    DocumentKind, DocumentUpload, LoanDraft, LoanRecord, Principal, UserRole,
};
use kasilend_server::engine::{EngineError, LoanEngine};
use kasilend_server::services::AuditLog;
use kasilend_server::storage::{DocumentStore, MemoryDocumentStore, StorageError};
use kasilend_server::store::{
    CollectionStore, Filter, MemoryStore, Order, StoreError, StoredRecord,
};

fn build_engine_with(
    store: Arc<dyn CollectionStore>,
    documents: Arc<dyn DocumentStore>,
) -> LoanEngine {
    let audit = AuditLog::new(store.clone());
    LoanEngine::new(
        store,
        documents,
        audit,
        money::DEFAULT_INTEREST_RATE,
        "loan-documents".to_string(),
    )
}

fn build_engine(store: Arc<dyn CollectionStore>) -> LoanEngine {
    build_engine_with(store, Arc::new(MemoryDocumentStore::new()))
}

fn memory_engine() -> LoanEngine {
    build_engine(Arc::new(MemoryStore::new()))
}

fn valid_draft() -> LoanDraft {
    LoanDraft {
        full_name: "Thandi Nkosi".to_string(),
        email: "thandi@example.com".to_string(),
        phone: "0821234567".to_string(),
        id_number: "9001015009087".to_string(),
        gender: "female".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        address: "12 Vilakazi Street, Soweto".to_string(),
        amount: dec!(5000),
        bank: "FNB".to_string(),
        account_number: "62001234567".to_string(),
        purpose: "School fees for the new term".to_string(),
        due_date: (Utc::now() + Duration::days(30)).date_naive(),
    }
}

fn required_documents() -> Vec<DocumentUpload> {
    vec![
        DocumentUpload {
            kind: DocumentKind::IdDocument,
            content_type: "application/pdf".to_string(),
            bytes: vec![1, 2, 3],
        },
        DocumentUpload {
            kind: DocumentKind::BankStatement,
            content_type: "application/pdf".to_string(),
            bytes: vec![4, 5, 6],
        },
    ]
}

fn admin() -> Principal {
    Principal {
        id: Uuid::new_v4(),
        email: "admin@example.com".to_string(),
        role: UserRole::Admin,
        confirmed: true,
    }
}

fn standard_user() -> Principal {
    Principal {
        id: Uuid::new_v4(),
        email: "user@example.com".to_string(),
        role: UserRole::Standard,
        confirmed: true,
    }
}

#[tokio::test]
async fn submit_creates_pending_record_with_document_urls() {
    let engine = memory_engine();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();

    assert!(app.id_document_url.is_some());
    assert!(app.bank_statement_url.is_some());
    assert!(app.proof_of_income_url.is_none());

    let pending = engine.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, app.id);
    assert_eq!(pending[0].amount, dec!(5000.00));
}

#[tokio::test]
async fn invalid_submission_persists_nothing() {
    let engine = memory_engine();

    let mut draft = valid_draft();
    draft.amount = dec!(0);
    assert!(matches!(
        engine.submit(draft, required_documents()).await,
        Err(EngineError::Validation(_))
    ));

    let mut draft = valid_draft();
    draft.due_date = (Utc::now() - Duration::days(1)).date_naive();
    assert!(matches!(
        engine.submit(draft, required_documents()).await,
        Err(EngineError::Validation(_))
    ));

    // Missing bank statement.
    let docs = vec![DocumentUpload {
        kind: DocumentKind::IdDocument,
        content_type: "application/pdf".to_string(),
        bytes: vec![1],
    }];
    assert!(matches!(
        engine.submit(valid_draft(), docs).await,
        Err(EngineError::Validation(_))
    ));

    let counts = engine.counts().await.unwrap();
    assert_eq!(counts.pending, 0);
    assert_eq!(counts.approved, 0);
    assert_eq!(counts.rejected, 0);
}

#[tokio::test]
async fn oversized_document_is_rejected() {
    let engine = memory_engine();
    let mut docs = required_documents();
    docs[0].bytes = vec![0; 5 * 1024 * 1024 + 1];
    assert!(matches!(
        engine.submit(valid_draft(), docs).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn approve_moves_record_and_computes_total_return() {
    let engine = memory_engine();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();

    let approved = engine.approve(app.id, &admin()).await.unwrap();
    assert_eq!(approved.id, app.id);
    assert_eq!(approved.total_return, dec!(6999.50));
    assert!(!approved.settled);

    assert!(engine.pending().await.unwrap().is_empty());
    let book = engine.approved().await.unwrap();
    assert_eq!(book.len(), 1);

    let revenue = engine.revenue().await.unwrap();
    assert_eq!(revenue.total_principal, dec!(5000.00));
    assert_eq!(revenue.total_return, dec!(6999.50));
}

#[tokio::test]
async fn non_admin_decision_is_refused_before_any_change() {
    let engine = memory_engine();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();

    for principal in [standard_user(), {
        let mut p = standard_user();
        p.role = UserRole::Editor;
        p
    }] {
        assert!(matches!(
            engine.approve(app.id, &principal).await,
            Err(EngineError::Authorization(_))
        ));
        assert!(matches!(
            engine.reject(app.id, &principal).await,
            Err(EngineError::Authorization(_))
        ));
    }

    let counts = engine.counts().await.unwrap();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.approved, 0);
    assert_eq!(counts.rejected, 0);
}

#[tokio::test]
async fn second_decision_reports_already_decided() {
    let engine = memory_engine();
    let admin = admin();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();

    engine.approve(app.id, &admin).await.unwrap();
    assert!(matches!(
        engine.approve(app.id, &admin).await,
        Err(EngineError::AlreadyDecided(_))
    ));
    assert!(matches!(
        engine.reject(app.id, &admin).await,
        Err(EngineError::AlreadyDecided(_))
    ));

    let counts = engine.counts().await.unwrap();
    assert_eq!(counts.approved, 1);
    assert_eq!(counts.rejected, 0);
}

#[tokio::test]
async fn racing_decisions_let_exactly_one_win() {
    let engine = memory_engine();
    let admin = admin();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        engine.approve(app.id, &admin),
        engine.approve(app.id, &admin)
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(EngineError::AlreadyDecided(_)))));

    let counts = engine.counts().await.unwrap();
    assert_eq!(counts.pending, 0);
    assert_eq!(counts.approved, 1);
}

#[tokio::test]
async fn deciding_unknown_id_reports_not_found() {
    let engine = memory_engine();
    assert!(matches!(
        engine.approve(Uuid::new_v4(), &admin()).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn reject_moves_record_without_interest() {
    let engine = memory_engine();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();

    let rejected = engine.reject(app.id, &admin()).await.unwrap();
    assert_eq!(rejected.id, app.id);

    assert!(engine.pending().await.unwrap().is_empty());
    assert_eq!(engine.rejected().await.unwrap().len(), 1);
    let revenue = engine.revenue().await.unwrap();
    assert_eq!(revenue.total_return, dec!(0));
}

#[tokio::test]
async fn find_follows_the_record_across_states() {
    let engine = memory_engine();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();

    assert!(matches!(
        engine.find(app.id).await.unwrap(),
        LoanRecord::Pending(_)
    ));
    engine.approve(app.id, &admin()).await.unwrap();
    assert!(matches!(
        engine.find(app.id).await.unwrap(),
        LoanRecord::Approved(_)
    ));
    assert!(matches!(
        engine.find(Uuid::new_v4()).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn settle_marks_the_approved_loan() {
    let engine = memory_engine();
    let admin = admin();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();
    engine.approve(app.id, &admin).await.unwrap();

    let settled = engine.settle(app.id, &admin).await.unwrap();
    assert!(settled.settled);
    let book = engine.approved().await.unwrap();
    assert!(book[0].settled);
}

#[tokio::test]
async fn preview_matches_persisted_total_return() {
    let engine = memory_engine();
    let admin = admin();

    let preview = engine.preview_return(dec!(5000)).unwrap();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();
    let approved = engine.approve(app.id, &admin).await.unwrap();

    assert_eq!(preview, approved.total_return);
    assert_eq!(money::format_rand(approved.total_return), "R6999.50");
}

#[tokio::test]
async fn first_month_with_revenue_reads_plus_hundred_percent() {
    let engine = memory_engine();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();
    engine.approve(app.id, &admin()).await.unwrap();

    let comparison = engine.month_over_month().await.unwrap();
    assert_eq!(comparison.current, dec!(6999.50));
    assert_eq!(comparison.previous, dec!(0));
    assert_eq!(comparison.change_pct, dec!(100));
}

#[tokio::test]
async fn empty_months_still_read_plus_hundred_percent() {
    let engine = memory_engine();
    let comparison = engine.month_over_month().await.unwrap();
    assert_eq!(comparison.change_pct, dec!(100));
}

/// Document store wrapper that can be switched into a failing mode.
struct FlakyDocumentStore {
    inner: MemoryDocumentStore,
    fail_uploads: AtomicBool,
}

impl FlakyDocumentStore {
    fn new() -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            fail_uploads: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyDocumentStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Upload("simulated outage".to_string()));
        }
        self.inner.upload(bucket, path, bytes, content_type).await
    }
}

#[tokio::test]
async fn failed_upload_reports_the_record_id_and_attach_repairs_it() {
    let store = Arc::new(MemoryStore::new());
    let documents = Arc::new(FlakyDocumentStore::new());
    documents.fail_uploads.store(true, Ordering::SeqCst);
    let engine = build_engine_with(store, documents.clone());

    let err = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap_err();
    let id = match err {
        EngineError::DocumentsNotStored { id, .. } => id,
        other => panic!("unexpected error: {}", other),
    };

    // The pending record survived phase one, without URLs.
    let pending = engine.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert!(pending[0].id_document_url.is_none());
    assert!(pending[0].bank_statement_url.is_none());

    // Re-uploading against the reported id repairs the record.
    documents.fail_uploads.store(false, Ordering::SeqCst);
    let repaired = engine
        .attach_documents(id, required_documents())
        .await
        .unwrap();
    assert!(repaired.id_document_url.is_some());
    assert!(repaired.bank_statement_url.is_some());

    let pending = engine.pending().await.unwrap();
    assert!(pending[0].id_document_url.is_some());
    assert!(pending[0].bank_statement_url.is_some());
}

#[tokio::test]
async fn attach_documents_updates_an_intact_record() {
    let engine = memory_engine();
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();
    let before = app.id_document_url.clone().unwrap();

    let docs = vec![DocumentUpload {
        kind: DocumentKind::ProofOfIncome,
        content_type: "application/pdf".to_string(),
        bytes: vec![9, 9],
    }];
    let updated = engine.attach_documents(app.id, docs).await.unwrap();
    assert!(updated.proof_of_income_url.is_some());
    assert_eq!(updated.id_document_url.unwrap(), before);

    assert!(matches!(
        engine.attach_documents(Uuid::new_v4(), required_documents()).await,
        Err(EngineError::NotFound(_))
    ));
}

/// Store wrapper that fails the next delete, to force a partial
/// transition.
struct FlakyStore {
    inner: MemoryStore,
    fail_next_delete: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_next_delete: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl CollectionStore for FlakyStore {
    async fn insert(
        &self,
        collection: &str,
        id: Option<Uuid>,
        data: Value,
    ) -> Result<StoredRecord, StoreError> {
        self.inner.insert(collection, id, data).await
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<(), StoreError> {
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        if self.fail_next_delete.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated outage".to_string()));
        }
        self.inner.delete(collection, id).await
    }

    async fn fetch(&self, collection: &str, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        self.inner.fetch(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        order: Order,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        self.inner.query(collection, filter, order).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<i64, StoreError> {
        self.inner.count(collection, filter).await
    }
}

#[tokio::test]
async fn failed_delete_surfaces_partial_transition_and_reconcile_recovers() {
    let store = Arc::new(FlakyStore::new());
    let engine = build_engine(store.clone());
    let admin = admin();

    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();

    store.fail_next_delete.store(true, Ordering::SeqCst);
    let err = engine.approve(app.id, &admin).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::PartialTransition {
            destination: "approved",
            ..
        }
    ));

    // The record now exists in both collections.
    let counts = engine.counts().await.unwrap();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.approved, 1);

    // Reconcile retries only the delete.
    assert!(engine.reconcile(app.id, &admin).await.unwrap());
    let counts = engine.counts().await.unwrap();
    assert_eq!(counts.pending, 0);
    assert_eq!(counts.approved, 1);

    // A second reconcile is a no-op.
    assert!(!engine.reconcile(app.id, &admin).await.unwrap());
}

#[tokio::test]
async fn reconcile_requires_a_decided_record() {
    let engine = memory_engine();
    let admin = admin();

    // Undecided pending record must not be reconciled away.
    let app = engine
        .submit(valid_draft(), required_documents())
        .await
        .unwrap();
    assert!(matches!(
        engine.reconcile(app.id, &admin).await,
        Err(EngineError::NotFound(_))
    ));
    assert_eq!(engine.counts().await.unwrap().pending, 1);

    assert!(matches!(
        engine.reconcile(app.id, &standard_user()).await,
        Err(EngineError::Authorization(_))
    ));
}
