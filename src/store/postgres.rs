//! PostgreSQL collection store
//!
//! One table per collection, each `(id uuid primary key, data jsonb,
//! created_at timestamptz)`. Filters compile to jsonb containment, so an
//! empty filter is `data @> '{}'` and matches everything.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::{check_collection, CollectionStore, Filter, Order, StoreError, StoredRecord};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn filter_object(filter: &Filter) -> Value {
    let mut object = serde_json::Map::new();
    for (field, value) in filter.terms() {
        object.insert(field.clone(), value.clone());
    }
    Value::Object(object)
}

fn order_clause(order: Order) -> String {
    match order {
        Order::Unordered => String::new(),
        Order::CreatedAsc => " ORDER BY created_at ASC".to_string(),
        Order::CreatedDesc => " ORDER BY created_at DESC".to_string(),
        // jsonb comparison orders numbers numerically, which text ordering
        // on ->> would not.
        Order::FieldAsc(field) => format!(" ORDER BY data->'{}' ASC", field),
    }
}

fn backend_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl CollectionStore for PgStore {
    async fn insert(
        &self,
        collection: &str,
        id: Option<Uuid>,
        data: Value,
    ) -> Result<StoredRecord, StoreError> {
        check_collection(collection)?;
        let id = id.unwrap_or_else(Uuid::new_v4);
        let sql = format!(
            "INSERT INTO {} (id, data, created_at) VALUES ($1, $2, $3) RETURNING id, data, created_at",
            collection
        );
        let row: (Uuid, Value, DateTime<Utc>) = sqlx::query_as(&sql)
            .bind(id)
            .bind(&data)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db)
                    if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
                {
                    StoreError::Conflict {
                        collection: collection.to_string(),
                        id,
                    }
                }
                _ => backend_err(e),
            })?;
        Ok(StoredRecord {
            id: row.0,
            data: row.1,
            created_at: row.2,
        })
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<(), StoreError> {
        check_collection(collection)?;
        let sql = format!("UPDATE {} SET data = data || $2 WHERE id = $1", collection);
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(&patch)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        check_collection(collection)?;
        let sql = format!("DELETE FROM {} WHERE id = $1", collection);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch(&self, collection: &str, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        check_collection(collection)?;
        let sql = format!(
            "SELECT id, data, created_at FROM {} WHERE id = $1",
            collection
        );
        let row: Option<(Uuid, Value, DateTime<Utc>)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.map(|(id, data, created_at)| StoredRecord {
            id,
            data,
            created_at,
        }))
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        order: Order,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        check_collection(collection)?;
        let sql = format!(
            "SELECT id, data, created_at FROM {} WHERE data @> $1{}",
            collection,
            order_clause(order)
        );
        let rows: Vec<(Uuid, Value, DateTime<Utc>)> = sqlx::query_as(&sql)
            .bind(filter_object(filter))
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows
            .into_iter()
            .map(|(id, data, created_at)| StoredRecord {
                id,
                data,
                created_at,
            })
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<i64, StoreError> {
        check_collection(collection)?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE data @> $1", collection);
        let count: (i64,) = sqlx::query_as(&sql)
            .bind(filter_object(filter))
            .fetch_one(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(count.0)
    }
}
