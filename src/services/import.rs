use crate::error::AppError;
use crate::models::{ImportJob, Period, TransactionRecord};
use crate::services::database::MongoDb;
use crate::services::jobs::ImportJobStore;
use crate::services::parser::{CsvBatchParser, RowOutcome};
use crate::workers::ImportTask;
use mongodb::ClientSession;
use mongodb::bson::doc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::instrument;

/// Strips structural quoting (`123 key "..."` prefixes, trailing quotes) from
/// messages bound for the job document, so storage-layer error text never
/// lands verbatim in a persisted record.
static QUOTED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\d+\s+\w+\s+""#).expect("invalid message prefix regex"));

/// Coordinates one monthly import: claim the job, parse the batch, then
/// replace the period's records and record the outcome as a single Mongo
/// transaction. A re-import of the same period is idempotent: the period
/// always converges to exactly the latest batch's valid rows.
pub struct ImportService {
    db: MongoDb,
    jobs: ImportJobStore,
    max_stored_errors: usize,
}

impl ImportService {
    pub fn new(db: MongoDb, jobs: ImportJobStore, max_stored_errors: usize) -> Self {
        Self {
            db,
            jobs,
            max_stored_errors,
        }
    }

    /// Claim the (workspace, period) job and hand the batch to the worker
    /// pool. Returns the claimed job immediately; the import itself runs in
    /// the background and its outcome lands on the job record.
    #[instrument(skip(self, data, queue), fields(workspace_id = %workspace_id, period = %period, bytes = data.len()))]
    pub async fn enqueue(
        &self,
        workspace_id: &str,
        period: Period,
        data: Vec<u8>,
        queue: &mpsc::Sender<ImportTask>,
    ) -> Result<ImportJob, AppError> {
        let claimed = self.jobs.mark_processing(workspace_id, period).await?;

        let task = ImportTask {
            workspace_id: workspace_id.to_string(),
            period,
            data,
        };

        if queue.try_send(task).is_err() {
            // The claim must not wedge the key in `processing` forever.
            self.fail_job(workspace_id, period, "Import queue full").await;
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Import queue full"
            )));
        }

        metrics::counter!("imports_enqueued_total").increment(1);
        Ok(claimed)
    }

    /// Synchronous entry point: claim the job and run the whole import,
    /// returning the final job record. Shares the claim with [`enqueue`],
    /// so both paths honor the single-flight rule.
    ///
    /// [`enqueue`]: ImportService::enqueue
    pub async fn import_month<R: Read>(
        &self,
        workspace_id: &str,
        period: Period,
        input: R,
    ) -> Result<ImportJob, AppError> {
        self.jobs.mark_processing(workspace_id, period).await?;
        self.run_import(workspace_id, period, input).await
    }

    /// Parse, partition and atomically replace one period's records. The
    /// job has already been claimed. Failures (structural or storage) mark
    /// the job `failed` best-effort and propagate.
    #[instrument(skip(self, input), fields(workspace_id = %workspace_id, period = %period))]
    pub async fn run_import<R: Read>(
        &self,
        workspace_id: &str,
        period: Period,
        input: R,
    ) -> Result<ImportJob, AppError> {
        let started = Instant::now();
        metrics::counter!("imports_started_total").increment(1);

        let outcomes = match CsvBatchParser::parse(workspace_id, input, period) {
            Ok(outcomes) => outcomes,
            Err(parse_error) => {
                self.fail_job(workspace_id, period, &parse_error.to_string())
                    .await;
                metrics::counter!("imports_failed_total").increment(1);
                return Err(parse_error);
            }
        };

        let total_rows = outcomes.len();
        let mut records = Vec::new();
        let mut messages = Vec::new();
        for outcome in outcomes {
            match outcome {
                RowOutcome::Valid(record) => records.push(record),
                RowOutcome::Rejected(message) => {
                    // Messages are a bounded sample; the rejected count
                    // below stays exact.
                    if messages.len() < self.max_stored_errors {
                        messages.push(sanitize_message(&message));
                    }
                }
            }
        }
        let imported_rows = records.len() as i64;
        let rejected_rows = (total_rows - records.len()) as i64;

        if let Err(storage_error) = self
            .replace_period(
                workspace_id,
                period,
                &records,
                imported_rows,
                rejected_rows,
                messages,
            )
            .await
        {
            self.fail_job(workspace_id, period, &storage_error.to_string())
                .await;
            metrics::counter!("imports_failed_total").increment(1);
            return Err(storage_error);
        }

        metrics::histogram!("import_duration_seconds").record(started.elapsed().as_secs_f64());

        tracing::info!(
            imported_rows,
            rejected_rows,
            duration_ms = started.elapsed().as_millis(),
            "Import finished"
        );

        self.jobs.get_status(workspace_id, period).await
    }

    /// Delete-old, insert-new and the job outcome commit as one transaction;
    /// concurrent readers never observe the intermediate state.
    async fn replace_period(
        &self,
        workspace_id: &str,
        period: Period,
        records: &[TransactionRecord],
        imported_rows: i64,
        rejected_rows: i64,
        messages: Vec<String>,
    ) -> Result<(), AppError> {
        let mut session = self.db.client().start_session(None).await?;
        session.start_transaction(None).await?;

        match self
            .replace_in_session(
                &mut session,
                workspace_id,
                period,
                records,
                imported_rows,
                rejected_rows,
                messages,
            )
            .await
        {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(replace_error) => {
                if let Err(abort_error) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_error, "Failed to abort import transaction");
                }
                Err(replace_error)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn replace_in_session(
        &self,
        session: &mut ClientSession,
        workspace_id: &str,
        period: Period,
        records: &[TransactionRecord],
        imported_rows: i64,
        rejected_rows: i64,
        messages: Vec<String>,
    ) -> Result<(), AppError> {
        let period_filter = doc! {
            "workspace_id": workspace_id,
            "year": period.year(),
            "month": period.month() as i32,
        };

        self.db
            .transactions()
            .delete_many_with_session(period_filter, None, session)
            .await?;

        if !records.is_empty() {
            self.db
                .transactions()
                .insert_many_with_session(records, None, session)
                .await?;
        }

        self.jobs
            .mark_completed_in_session(
                session,
                workspace_id,
                period,
                imported_rows,
                rejected_rows,
                messages,
            )
            .await?;

        Ok(())
    }

    /// Best-effort terminal failure mark, used outside the atomic unit. Its
    /// own failure is logged, not retried and not surfaced.
    async fn fail_job(&self, workspace_id: &str, period: Period, message: &str) {
        let sanitized = sanitize_message(message);
        if let Err(mark_error) = self.jobs.mark_failed(workspace_id, period, &sanitized).await {
            tracing::error!(
                workspace_id = %workspace_id,
                period = %period,
                error = %mark_error,
                "Could not mark import job as failed"
            );
        }
    }
}

fn sanitize_message(message: &str) -> String {
    let without_prefix = QUOTED_PREFIX.replace(message, "").into_owned();
    let without_suffix = without_prefix
        .strip_suffix('"')
        .unwrap_or(&without_prefix);
    without_suffix.replace(['\r', '\n'], "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::sanitize_message;

    #[test]
    fn plain_messages_pass_through() {
        assert_eq!(
            sanitize_message("Line 3: invalid IBAN format"),
            "Line 3: invalid IBAN format"
        );
    }

    #[test]
    fn strips_structural_quoting_and_control_characters() {
        assert_eq!(
            sanitize_message("11000 E11000 \"duplicate key\r\nerror\""),
            "duplicate keyerror"
        );
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(sanitize_message("  failed \r\n"), "failed");
    }
}
