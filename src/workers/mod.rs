use crate::config::ImportConfig;
use crate::models::Period;
use crate::services::import::ImportService;
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// A claimed import waiting for a worker. The job record is already in
/// `processing` when the task is queued.
#[derive(Debug)]
pub struct ImportTask {
    pub workspace_id: String,
    pub period: Period,
    pub data: Vec<u8>,
}

/// Bounded pool running imports off the request path. Tasks queue on a
/// bounded channel; `worker_count` workers drain it until shutdown.
pub struct ImportWorkerPool {
    config: ImportConfig,
    service: Arc<ImportService>,
    task_rx: Option<mpsc::Receiver<ImportTask>>,
    shutdown: CancellationToken,
}

impl ImportWorkerPool {
    pub fn new(config: ImportConfig, service: Arc<ImportService>) -> (Self, mpsc::Sender<ImportTask>) {
        let (task_tx, task_rx) = mpsc::channel(config.queue_size);

        let pool = Self {
            config,
            service,
            task_rx: Some(task_rx),
            shutdown: CancellationToken::new(),
        };

        (pool, task_tx)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn start(mut self) {
        let task_rx = self.task_rx.take().expect("start() can only be called once");
        let task_rx = Arc::new(Mutex::new(task_rx));

        tracing::info!(
            worker_count = self.config.worker_count,
            queue_size = self.config.queue_size,
            "Starting import worker pool"
        );

        for worker_id in 0..self.config.worker_count {
            let task_rx = task_rx.clone();
            let service = self.service.clone();
            let shutdown = self.shutdown.clone();

            tokio::spawn(async move {
                loop {
                    let task = {
                        let mut rx = task_rx.lock().await;
                        tokio::select! {
                            _ = shutdown.cancelled() => None,
                            task = rx.recv() => task,
                        }
                    };

                    let Some(task) = task else {
                        tracing::info!(worker_id, "Import worker exiting");
                        break;
                    };

                    Self::process(worker_id, &service, task).await;
                }
            });
        }
    }

    async fn process(worker_id: usize, service: &ImportService, task: ImportTask) {
        let ImportTask {
            workspace_id,
            period,
            data,
        } = task;

        tracing::info!(
            worker_id,
            workspace_id = %workspace_id,
            period = %period,
            bytes = data.len(),
            "Import task started"
        );

        // Once the task is running it goes to completion or failure; there
        // is no mid-import cancellation.
        match service
            .run_import(&workspace_id, period, Cursor::new(data))
            .await
        {
            Ok(job) => tracing::info!(
                worker_id,
                imported_rows = job.imported_rows,
                rejected_rows = job.rejected_rows,
                "Import task finished"
            ),
            // The failure is already recorded on the job record.
            Err(error) => tracing::warn!(worker_id, error = %error, "Import task failed"),
        }
    }
}
