use crate::error::AppError;
use crate::models::{ImportJob, ImportJobState, Period};
use crate::services::database::MongoDb;
use mongodb::ClientSession;
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, ReplaceOptions, ReturnDocument};
use tracing::instrument;
use uuid::Uuid;

/// Persistent state machine over the `import_jobs` collection, keyed by
/// (workspace, period). Jobs are created lazily on first touch and never
/// deleted; a missing record reads as the virtual `NotFound` state.
#[derive(Clone)]
pub struct ImportJobStore {
    db: MongoDb,
}

impl ImportJobStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    fn key_filter(workspace_id: &str, period: Period) -> Document {
        doc! {
            "workspace_id": workspace_id,
            "year": period.year(),
            "month": period.month() as i32,
        }
    }

    /// Atomically claim the job for processing.
    ///
    /// A plain read-then-write would leave a race window between two
    /// concurrent imports of the same key, so the claim is a single upsert
    /// whose filter excludes jobs already in `processing`. When such a job
    /// exists the filter matches nothing, the upsert insert collides with
    /// the unique (workspace_id, year, month) index, and the duplicate-key
    /// error maps to a conflict for the losing caller.
    #[instrument(skip(self), fields(workspace_id = %workspace_id, period = %period))]
    pub async fn mark_processing(
        &self,
        workspace_id: &str,
        period: Period,
    ) -> Result<ImportJob, AppError> {
        let mut filter = Self::key_filter(workspace_id, period);
        filter.insert(
            "state",
            doc! { "$ne": ImportJobState::Processing.as_str() },
        );

        let update = doc! {
            "$set": {
                "state": ImportJobState::Processing.as_str(),
                "errors": [],
                "updated_at": mongodb::bson::DateTime::now(),
            },
            "$setOnInsert": {
                "_id": Uuid::new_v4().to_string(),
                "imported_rows": 0_i64,
                "rejected_rows": 0_i64,
            },
        };

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        match self
            .db
            .import_jobs()
            .find_one_and_update(filter, update, options)
            .await
        {
            Ok(Some(job)) => Ok(job),
            Ok(None) => Err(Self::already_processing(workspace_id, period)),
            Err(e) if is_duplicate_key(&e) => Err(Self::already_processing(workspace_id, period)),
            Err(e) => Err(AppError::from(e)),
        }
    }

    /// Record the terminal outcome inside the caller's transaction session so
    /// it commits or aborts together with the period's records.
    pub async fn mark_completed_in_session(
        &self,
        session: &mut ClientSession,
        workspace_id: &str,
        period: Period,
        imported_rows: i64,
        rejected_rows: i64,
        errors: Vec<String>,
    ) -> Result<(), AppError> {
        let filter = Self::key_filter(workspace_id, period);
        let current = self
            .db
            .import_jobs()
            .find_one_with_session(filter.clone(), None, session)
            .await?
            .unwrap_or_else(|| ImportJob::new_processing(workspace_id, period));

        let updated = current.mark_completed(imported_rows, rejected_rows, errors);

        let options = ReplaceOptions::builder().upsert(true).build();
        self.db
            .import_jobs()
            .replace_one_with_session(filter, &updated, options, session)
            .await?;

        Ok(())
    }

    /// Terminal failure mark. Counts keep their last values; the error list
    /// collapses to the one failure reason.
    #[instrument(skip(self, error), fields(workspace_id = %workspace_id, period = %period))]
    pub async fn mark_failed(
        &self,
        workspace_id: &str,
        period: Period,
        error: &str,
    ) -> Result<(), AppError> {
        let current = self
            .find(workspace_id, period)
            .await?
            .unwrap_or_else(|| ImportJob::new_processing(workspace_id, period));

        let updated = current.mark_failed(error);

        let options = ReplaceOptions::builder().upsert(true).build();
        self.db
            .import_jobs()
            .replace_one(Self::key_filter(workspace_id, period), &updated, options)
            .await?;

        Ok(())
    }

    pub async fn find(
        &self,
        workspace_id: &str,
        period: Period,
    ) -> Result<Option<ImportJob>, AppError> {
        let job = self
            .db
            .import_jobs()
            .find_one(Self::key_filter(workspace_id, period), None)
            .await?;
        Ok(job)
    }

    /// Status surface: a missing job reads as the `NotFound` placeholder
    /// rather than an error.
    pub async fn get_status(
        &self,
        workspace_id: &str,
        period: Period,
    ) -> Result<ImportJob, AppError> {
        Ok(self
            .find(workspace_id, period)
            .await?
            .unwrap_or_else(|| ImportJob::not_found(workspace_id, period)))
    }

    /// True iff the stored state is `completed` or `with_warning`.
    pub async fn is_completed(&self, workspace_id: &str, period: Period) -> Result<bool, AppError> {
        Ok(self
            .find(workspace_id, period)
            .await?
            .map(|job| job.is_completed())
            .unwrap_or(false))
    }

    fn already_processing(workspace_id: &str, period: Period) -> AppError {
        AppError::Conflict(anyhow::anyhow!(
            "Import already in progress for workspace={} and month={}",
            workspace_id,
            period
        ))
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::Command(command_error) => command_error.code == 11000,
        _ => false,
    }
}
