//! Stokvela schedule reads
//!
//! The rotation schedule is maintained elsewhere; this service only reads
//! it, in member order.

use std::sync::Arc;

use crate::domain::StokvelaMember;
use crate::store::{collections, CollectionStore, Filter, Order, StoreError};

pub struct StokvelaService {
    store: Arc<dyn CollectionStore>,
}

impl StokvelaService {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    pub async fn members(&self) -> Result<Vec<StokvelaMember>, StoreError> {
        let records = self
            .store
            .query(
                collections::STOKVELA_MEMBERS,
                &Filter::none(),
                Order::FieldAsc("member_number"),
            )
            .await?;
        records.iter().map(|r| r.decode()).collect()
    }
}
