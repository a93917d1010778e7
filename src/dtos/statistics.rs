use crate::models::Period;
use crate::services::statistics::{MonthlyStatsRow, StatisticsGroupBy};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
    pub date: Period,
    #[serde(default = "default_group_by")]
    pub group_by: StatisticsGroupBy,
}

fn default_group_by() -> StatisticsGroupBy {
    StatisticsGroupBy::Summary
}

#[derive(Debug, Serialize)]
pub struct MonthlyStatisticsResponse {
    pub workspace_id: String,
    pub month: Period,
    pub grouped_by: StatisticsGroupBy,
    pub rows: Vec<MonthlyStatisticsRow>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyStatisticsRow {
    pub key: String,
    pub transactions_count: i64,
    pub total_amount: Decimal,
}

impl From<MonthlyStatsRow> for MonthlyStatisticsRow {
    fn from(row: MonthlyStatsRow) -> Self {
        Self {
            key: row.key,
            transactions_count: row.transactions_count,
            total_amount: row.total_amount,
        }
    }
}
