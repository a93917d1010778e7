use crate::models::{ImportJob, ImportJobState, Period};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status surface for one (workspace, period) import job. Absent jobs are
/// reported with the `not_found` state and zeroed counts rather than an
/// HTTP error.
#[derive(Debug, Serialize)]
pub struct ImportJobStatusResponse {
    pub workspace_id: String,
    pub month: Period,
    pub state: ImportJobState,
    pub imported_rows: i64,
    pub rejected_rows: i64,
    pub errors: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJobStatusResponse {
    pub fn from_job(job: ImportJob, period: Period) -> Self {
        Self {
            workspace_id: job.workspace_id,
            month: period,
            state: job.state,
            imported_rows: job.imported_rows,
            rejected_rows: job.rejected_rows,
            errors: job.errors,
            updated_at: job.updated_at,
        }
    }
}
