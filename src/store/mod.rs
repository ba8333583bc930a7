//! Persistence gateway
//!
//! A generic CRUD facade over named collections. The engine composes these
//! operations and never talks to a database driver directly, so the same
//! code runs over PostgreSQL in production and the in-memory store in
//! tests. The store never retries on its own: a failed insert is not
//! idempotent, and retries are the caller's decision.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Collection names, matching the hosted-service tables they replace.
pub mod collections {
    pub const LOAN_APPLICATIONS: &str = "loan_applications";
    pub const APPROVED_LOANS: &str = "approved_loans";
    pub const REJECTED_LOANS: &str = "rejected_loans";
    pub const USERS_ACCOUNT: &str = "users_account";
    pub const STOKVELA_MEMBERS: &str = "stokvela_members";
    pub const USER_LOGS: &str = "user_logs";

    pub const ALL: [&str; 6] = [
        LOAN_APPLICATIONS,
        APPROVED_LOANS,
        REJECTED_LOANS,
        USERS_ACCOUNT,
        STOKVELA_MEMBERS,
        USER_LOGS,
    ];
}

/// Store-level failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record {id} already exists in {collection}")]
    Conflict { collection: String, id: Uuid },

    #[error("no record {id} in {collection}")]
    NotFound { collection: String, id: Uuid },

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// A record as held by the store: a JSON document keyed by UUID.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: Uuid,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Deserialize the document into a domain type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| StoreError::Backend(format!("record {} failed to decode: {}", self.id, e)))
    }
}

/// Field-equality filter over the document body.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    terms: Vec<(String, Value)>,
}

impl Filter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: Value) -> Self {
        self.terms.push((field.to_string(), value));
        self
    }

    pub fn terms(&self) -> &[(String, Value)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy)]
pub enum Order {
    Unordered,
    CreatedAsc,
    CreatedDesc,
    /// Ascending by a field of the document body.
    FieldAsc(&'static str),
}

/// Generic CRUD contract over named collections.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Insert a document. A caller-supplied id is honored (the lifecycle
    /// transition preserves the application id across collections) and a
    /// duplicate id surfaces as [`StoreError::Conflict`]; with no id the
    /// store generates one.
    async fn insert(
        &self,
        collection: &str,
        id: Option<Uuid>,
        data: Value,
    ) -> Result<StoredRecord, StoreError>;

    /// Shallow-merge the patch object into an existing document.
    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<(), StoreError>;

    /// Delete-if-exists. Returns whether a record was removed; deleting an
    /// absent id is not an error.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError>;

    async fn fetch(&self, collection: &str, id: Uuid) -> Result<Option<StoredRecord>, StoreError>;

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        order: Order,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<i64, StoreError>;
}

pub(crate) fn check_collection(collection: &str) -> Result<(), StoreError> {
    if collections::ALL.contains(&collection) {
        Ok(())
    } else {
        Err(StoreError::UnknownCollection(collection.to_string()))
    }
}
