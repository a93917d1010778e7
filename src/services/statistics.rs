use crate::error::AppError;
use crate::models::Period;
use crate::models::serde_helpers::decimal_as_decimal128;
use crate::services::database::MongoDb;
use crate::services::jobs::ImportJobStore;
use futures::stream::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const FIELD_CATEGORY: &str = "category";
const FIELD_IBAN: &str = "iban";
const SUMMARY_KEY: &str = "SUMMARY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsGroupBy {
    Category,
    Iban,
    Summary,
}

/// One aggregated bucket: the grouping key, how many records landed in it
/// and their summed amount.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyStatsRow {
    pub key: String,
    pub transactions_count: i64,
    #[serde(with = "decimal_as_decimal128")]
    pub total_amount: Decimal,
}

/// Read side of the import pipeline. Every query is gated on the period's
/// import job having reached a terminal success state, so statistics are
/// never computed over a partially written period.
#[derive(Clone)]
pub struct StatisticsService {
    db: MongoDb,
    jobs: ImportJobStore,
}

impl StatisticsService {
    pub fn new(db: MongoDb, jobs: ImportJobStore) -> Self {
        Self { db, jobs }
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, period = %period))]
    pub async fn monthly_statistics(
        &self,
        workspace_id: &str,
        period: Period,
        group_by: StatisticsGroupBy,
    ) -> Result<Vec<MonthlyStatsRow>, AppError> {
        if !self.jobs.is_completed(workspace_id, period).await? {
            return Err(AppError::NotReady(anyhow::anyhow!(
                "Statistics not ready. Import not completed for workspace={} and month={}",
                workspace_id,
                period
            )));
        }

        let pipeline = match group_by {
            StatisticsGroupBy::Category => grouped_pipeline(workspace_id, period, FIELD_CATEGORY),
            StatisticsGroupBy::Iban => grouped_pipeline(workspace_id, period, FIELD_IBAN),
            StatisticsGroupBy::Summary => summary_pipeline(workspace_id, period),
        };

        let cursor = self.db.transactions().aggregate(pipeline, None).await?;
        let rows: Vec<MonthlyStatsRow> = cursor.with_type::<MonthlyStatsRow>().try_collect().await?;

        metrics::counter!("statistics_queries_total").increment(1);
        Ok(rows)
    }
}

fn match_stage(workspace_id: &str, period: Period) -> Document {
    doc! {
        "$match": {
            "workspace_id": workspace_id,
            "year": period.year(),
            "month": period.month() as i32,
        }
    }
}

/// match -> group by one record field -> count + sum -> sort by total
/// amount, largest first.
fn grouped_pipeline(workspace_id: &str, period: Period, group_field: &str) -> Vec<Document> {
    vec![
        match_stage(workspace_id, period),
        doc! {
            "$group": {
                "_id": format!("${}", group_field),
                "transactions_count": { "$sum": 1 },
                "total_amount": { "$sum": "$amount" },
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "key": "$_id",
                "transactions_count": 1,
                "total_amount": 1,
            }
        },
        doc! { "$sort": { "total_amount": -1 } },
    ]
}

/// Single synthetic `SUMMARY` bucket over all matching records; no sort.
fn summary_pipeline(workspace_id: &str, period: Period) -> Vec<Document> {
    vec![
        match_stage(workspace_id, period),
        doc! {
            "$group": {
                "_id": Bson::Null,
                "transactions_count": { "$sum": 1 },
                "total_amount": { "$sum": "$amount" },
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "key": { "$literal": SUMMARY_KEY },
                "transactions_count": 1,
                "total_amount": 1,
            }
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> Period {
        Period::new(2026, 1).unwrap()
    }

    #[test]
    fn grouped_pipeline_matches_groups_projects_and_sorts() {
        let pipeline = grouped_pipeline("workspace-1", period(), FIELD_CATEGORY);
        assert_eq!(pipeline.len(), 4);

        let match_doc = pipeline[0].get_document("$match").unwrap();
        assert_eq!(match_doc.get_str("workspace_id").unwrap(), "workspace-1");
        assert_eq!(match_doc.get_i32("year").unwrap(), 2026);
        assert_eq!(match_doc.get_i32("month").unwrap(), 1);

        let group_doc = pipeline[1].get_document("$group").unwrap();
        assert_eq!(group_doc.get_str("_id").unwrap(), "$category");

        let sort_doc = pipeline[3].get_document("$sort").unwrap();
        assert_eq!(sort_doc.get_i32("total_amount").unwrap(), -1);
    }

    #[test]
    fn summary_pipeline_uses_single_bucket_without_sort() {
        let pipeline = summary_pipeline("workspace-1", period());
        assert_eq!(pipeline.len(), 3);

        let group_doc = pipeline[1].get_document("$group").unwrap();
        assert_eq!(group_doc.get("_id").unwrap(), &Bson::Null);

        let project_doc = pipeline[2].get_document("$project").unwrap();
        let key = project_doc.get_document("key").unwrap();
        assert_eq!(key.get_str("$literal").unwrap(), SUMMARY_KEY);
    }
}
