use crate::models::Period;
use crate::models::serde_helpers::decimal_as_decimal128;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One validated transaction row. The full set of records for a
/// (workspace, period) is owned by the latest successful import of that
/// period; imports replace, never merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub workspace_id: String,
    pub year: i32,
    pub month: u32,
    pub iban: String,
    pub transaction_date: NaiveDate,
    pub currency: String,
    pub category: String,
    #[serde(with = "decimal_as_decimal128")]
    pub amount: Decimal,
}

impl TransactionRecord {
    pub fn new(
        workspace_id: String,
        period: Period,
        iban: String,
        transaction_date: NaiveDate,
        currency: String,
        category: String,
        amount: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workspace_id,
            year: period.year(),
            month: period.month(),
            iban,
            transaction_date,
            currency,
            category,
            amount,
        }
    }
}
