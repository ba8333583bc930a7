//! Stokvela rotation schedule
//!
//! A stokvela is a rotating savings scheme: members contribute into a pool
//! and take turns receiving the payout. The schedule is maintained outside
//! this service; here it is read-only, ordered by member number.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StokvelaMember {
    pub id: Uuid,
    pub member_number: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub amount_paid: Decimal,
    pub amount_to_receive: Decimal,
    pub receiving_date: NaiveDate,
}
