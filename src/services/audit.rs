//! Best-effort audit log writer
//!
//! A failed audit write must never fail the operation it describes; it is
//! logged at warn and dropped.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{AuditAction, UserLog};
use crate::store::{collections, CollectionStore, Filter, Order, StoreError};

#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn CollectionStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    /// Append an audit record.
    pub async fn record(
        &self,
        user_id: Option<Uuid>,
        action: AuditAction,
        description: impl Into<String>,
        device: Option<String>,
    ) {
        let entry = UserLog {
            id: Uuid::new_v4(),
            user_id,
            action,
            description: description.into(),
            device,
            created_at: Utc::now(),
        };
        let data = match serde_json::to_value(&entry) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "audit record failed to serialize");
                return;
            }
        };
        if let Err(e) = self
            .store
            .insert(collections::USER_LOGS, Some(entry.id), data)
            .await
        {
            tracing::warn!(
                action = ?entry.action,
                error = %e,
                "audit record dropped"
            );
        }
    }

    /// Most recent entries first, for the admin activity view.
    pub async fn entries(&self) -> Result<Vec<UserLog>, StoreError> {
        let records = self
            .store
            .query(collections::USER_LOGS, &Filter::none(), Order::CreatedDesc)
            .await?;
        records.iter().map(|r| r.decode()).collect()
    }
}
