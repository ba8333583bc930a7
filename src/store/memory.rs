//! In-memory collection store
//!
//! Backs the test suite and the database-free dev mode. Semantics mirror
//! the PostgreSQL store: duplicate ids conflict, deletes are
//! delete-if-exists, patches shallow-merge.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{check_collection, CollectionStore, Filter, Order, StoreError, StoredRecord};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(record: &StoredRecord, filter: &Filter) -> bool {
    filter
        .terms()
        .iter()
        .all(|(field, value)| record.data.get(field) == Some(value))
}

fn field_key(value: Option<&Value>) -> (i8, f64, String) {
    // Numbers sort numerically, everything else lexically, nulls first.
    match value {
        Some(Value::Number(n)) => (1, n.as_f64().unwrap_or(0.0), String::new()),
        Some(Value::String(s)) => (2, 0.0, s.clone()),
        Some(other) => (2, 0.0, other.to_string()),
        None => (0, 0.0, String::new()),
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        id: Option<Uuid>,
        data: Value,
    ) -> Result<StoredRecord, StoreError> {
        check_collection(collection)?;
        let id = id.unwrap_or_else(Uuid::new_v4);
        let mut guard = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let records = guard.entry(collection.to_string()).or_default();
        if records.iter().any(|r| r.id == id) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id,
            });
        }
        let record = StoredRecord {
            id,
            data,
            created_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<(), StoreError> {
        check_collection(collection)?;
        let mut guard = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let records = guard.entry(collection.to_string()).or_default();
        let record = records.iter_mut().find(|r| r.id == id).ok_or_else(|| {
            StoreError::NotFound {
                collection: collection.to_string(),
                id,
            }
        })?;
        if let (Value::Object(target), Value::Object(fields)) = (&mut record.data, patch) {
            for (key, value) in fields {
                target.insert(key, value);
            }
            Ok(())
        } else {
            Err(StoreError::Backend(
                "update patch must be a JSON object".to_string(),
            ))
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        check_collection(collection)?;
        let mut guard = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let records = guard.entry(collection.to_string()).or_default();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn fetch(&self, collection: &str, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        check_collection(collection)?;
        let guard = self
            .collections
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(guard
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.id == id).cloned()))
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        order: Order,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        check_collection(collection)?;
        let guard = self
            .collections
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut results: Vec<StoredRecord> = guard
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| matches(r, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        match order {
            Order::Unordered => {}
            Order::CreatedAsc => results.sort_by_key(|r| r.created_at),
            Order::CreatedDesc => {
                results.sort_by_key(|r| r.created_at);
                results.reverse();
            }
            Order::FieldAsc(field) => {
                results.sort_by(|a, b| {
                    field_key(a.data.get(field))
                        .partial_cmp(&field_key(b.data.get(field)))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
        }
        Ok(results)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<i64, StoreError> {
        check_collection(collection)?;
        let guard = self
            .collections
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(guard
            .get(collection)
            .map(|records| records.iter().filter(|r| matches(r, filter)).count() as i64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::collections;
    use serde_json::json;

    #[tokio::test]
    async fn insert_generates_or_honors_id() {
        let store = MemoryStore::new();
        let generated = store
            .insert(collections::USER_LOGS, None, json!({"a": 1}))
            .await
            .unwrap();

        let id = Uuid::new_v4();
        let supplied = store
            .insert(collections::USER_LOGS, Some(id), json!({"a": 2}))
            .await
            .unwrap();

        assert_ne!(generated.id, supplied.id);
        assert_eq!(supplied.id, id);
    }

    #[tokio::test]
    async fn duplicate_id_conflicts() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store
            .insert(collections::APPROVED_LOANS, Some(id), json!({}))
            .await
            .unwrap();
        let err = store
            .insert(collections::APPROVED_LOANS, Some(id), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let store = MemoryStore::new();
        let record = store
            .insert(collections::LOAN_APPLICATIONS, None, json!({}))
            .await
            .unwrap();
        assert!(store
            .delete(collections::LOAN_APPLICATIONS, record.id)
            .await
            .unwrap());
        assert!(!store
            .delete(collections::LOAN_APPLICATIONS, record.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn update_shallow_merges() {
        let store = MemoryStore::new();
        let record = store
            .insert(
                collections::LOAN_APPLICATIONS,
                None,
                json!({"a": 1, "b": null}),
            )
            .await
            .unwrap();
        store
            .update(
                collections::LOAN_APPLICATIONS,
                record.id,
                json!({"b": "url", "c": 3}),
            )
            .await
            .unwrap();
        let fetched = store
            .fetch(collections::LOAN_APPLICATIONS, record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.data, json!({"a": 1, "b": "url", "c": 3}));
    }

    #[tokio::test]
    async fn query_filters_and_orders_numerically() {
        let store = MemoryStore::new();
        for (n, name) in [(10i64, "ten"), (2, "two"), (1, "one")] {
            store
                .insert(
                    collections::STOKVELA_MEMBERS,
                    None,
                    json!({"member_number": n, "full_name": name}),
                )
                .await
                .unwrap();
        }
        let ordered = store
            .query(
                collections::STOKVELA_MEMBERS,
                &Filter::none(),
                Order::FieldAsc("member_number"),
            )
            .await
            .unwrap();
        let numbers: Vec<i64> = ordered
            .iter()
            .map(|r| r.data["member_number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 2, 10]);

        let filtered = store
            .query(
                collections::STOKVELA_MEMBERS,
                &Filter::none().eq("full_name", json!("two")),
                Order::Unordered,
            )
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[tokio::test]
    async fn unknown_collection_is_rejected() {
        let store = MemoryStore::new();
        let err = store.insert("loans", None, json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection(_)));
    }
}
