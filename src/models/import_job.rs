use crate::models::Period;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportJobState {
    Processing,
    Completed,
    WithWarning,
    Failed,
    /// Virtual state reported when no job exists for a key; never persisted.
    NotFound,
}

impl ImportJobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportJobState::Processing => "processing",
            ImportJobState::Completed => "completed",
            ImportJobState::WithWarning => "with_warning",
            ImportJobState::Failed => "failed",
            ImportJobState::NotFound => "not_found",
        }
    }
}

/// Durable record of one import attempt per (workspace, period) key.
/// Created lazily on the first attempt, mutated in place by re-imports,
/// never deleted. The transition helpers return new values; persistence
/// decides what actually lands in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    #[serde(rename = "_id")]
    pub id: String,
    pub workspace_id: String,
    pub year: i32,
    pub month: u32,
    pub state: ImportJobState,
    pub imported_rows: i64,
    pub rejected_rows: i64,
    pub errors: Vec<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn new_processing(workspace_id: &str, period: Period) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workspace_id: workspace_id.to_string(),
            year: period.year(),
            month: period.month(),
            state: ImportJobState::Processing,
            imported_rows: 0,
            rejected_rows: 0,
            errors: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Placeholder returned for status queries when no job record exists.
    pub fn not_found(workspace_id: &str, period: Period) -> Self {
        Self {
            id: String::new(),
            workspace_id: workspace_id.to_string(),
            year: period.year(),
            month: period.month(),
            state: ImportJobState::NotFound,
            imported_rows: 0,
            rejected_rows: 0,
            errors: Vec::new(),
            updated_at: DateTime::UNIX_EPOCH,
        }
    }

    /// Reset for a re-import: prior rejection messages are cleared, counts
    /// keep their last values until the new outcome lands.
    pub fn mark_processing(self) -> Self {
        Self {
            state: ImportJobState::Processing,
            errors: Vec::new(),
            updated_at: Utc::now(),
            ..self
        }
    }

    pub fn mark_completed(self, imported_rows: i64, rejected_rows: i64, errors: Vec<String>) -> Self {
        let state = if rejected_rows > 0 {
            ImportJobState::WithWarning
        } else {
            ImportJobState::Completed
        };

        Self {
            state,
            imported_rows,
            rejected_rows,
            errors,
            updated_at: Utc::now(),
            ..self
        }
    }

    /// Counts keep their last values; the error list collapses to the one
    /// failure reason.
    pub fn mark_failed(self, error: impl Into<String>) -> Self {
        Self {
            state: ImportJobState::Failed,
            errors: vec![error.into()],
            updated_at: Utc::now(),
            ..self
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(
            self.state,
            ImportJobState::Completed | ImportJobState::WithWarning
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKSPACE_ID: &str = "workspace-1";

    fn period() -> Period {
        Period::new(2026, 1).unwrap()
    }

    #[test]
    fn creates_processing_job_with_defaults() {
        let job = ImportJob::new_processing(WORKSPACE_ID, period());

        assert_eq!(job.workspace_id, WORKSPACE_ID);
        assert_eq!(job.year, 2026);
        assert_eq!(job.month, 1);
        assert_eq!(job.state, ImportJobState::Processing);
        assert_eq!(job.imported_rows, 0);
        assert_eq!(job.rejected_rows, 0);
        assert!(job.errors.is_empty());
        assert!(!job.id.is_empty());
    }

    #[test]
    fn completes_without_warning_when_nothing_rejected() {
        let job = ImportJob::new_processing(WORKSPACE_ID, period()).mark_completed(10, 0, vec![]);

        assert_eq!(job.state, ImportJobState::Completed);
        assert_eq!(job.imported_rows, 10);
        assert_eq!(job.rejected_rows, 0);
        assert!(job.errors.is_empty());
        assert!(job.is_completed());
    }

    #[test]
    fn completes_with_warning_when_rows_rejected() {
        let errors = vec!["Line 3: invalid IBAN format".to_string()];
        let job =
            ImportJob::new_processing(WORKSPACE_ID, period()).mark_completed(8, 2, errors.clone());

        assert_eq!(job.state, ImportJobState::WithWarning);
        assert_eq!(job.imported_rows, 8);
        assert_eq!(job.rejected_rows, 2);
        assert_eq!(job.errors, errors);
        assert!(job.is_completed());
    }

    #[test]
    fn failing_keeps_last_counts_and_replaces_errors() {
        let job = ImportJob::new_processing(WORKSPACE_ID, period())
            .mark_completed(10, 2, vec!["old".to_string()])
            .mark_failed("Something failed");

        assert_eq!(job.state, ImportJobState::Failed);
        assert_eq!(job.imported_rows, 10);
        assert_eq!(job.rejected_rows, 2);
        assert_eq!(job.errors, vec!["Something failed".to_string()]);
        assert!(!job.is_completed());
    }

    #[test]
    fn reprocessing_clears_errors_but_keeps_counts() {
        let job = ImportJob::new_processing(WORKSPACE_ID, period())
            .mark_completed(10, 2, vec!["old".to_string()])
            .mark_processing();

        assert_eq!(job.state, ImportJobState::Processing);
        assert_eq!(job.imported_rows, 10);
        assert_eq!(job.rejected_rows, 2);
        assert!(job.errors.is_empty());
        assert!(!job.is_completed());
    }

    #[test]
    fn not_found_is_never_completed() {
        let job = ImportJob::not_found(WORKSPACE_ID, period());

        assert_eq!(job.state, ImportJobState::NotFound);
        assert!(!job.is_completed());
    }
}
