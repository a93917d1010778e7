use crate::error::AppError;
use crate::models::{ImportJob, TransactionRecord};
use mongodb::{
    Client as MongoClient, Collection, Database, IndexModel, bson::doc, options::IndexOptions,
};

const IMPORT_JOBS_COLLECTION: &str = "import_jobs";
const TRANSACTIONS_COLLECTION: &str = "transactions";

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for transactions-service");

        // Unique index on (workspace_id, year, month): the single-flight
        // claim in ImportJobStore::mark_processing depends on it.
        let job_key_index = IndexModel::builder()
            .keys(doc! { "workspace_id": 1, "year": 1, "month": 1 })
            .options(
                IndexOptions::builder()
                    .name("import_jobs_workspace_period_uq".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.import_jobs()
            .create_index(job_key_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create unique period index on import_jobs collection: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on import_jobs.(workspace_id, year, month)");

        // Period-scoped lookups: bulk delete-by-period and the statistics
        // aggregation both match on this prefix.
        let transaction_period_index = IndexModel::builder()
            .keys(doc! { "workspace_id": 1, "year": 1, "month": 1 })
            .options(
                IndexOptions::builder()
                    .name("transactions_workspace_period_idx".to_string())
                    .build(),
            )
            .build();

        self.transactions()
            .create_index(transaction_period_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create period index on transactions collection: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created index on transactions.(workspace_id, year, month)");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn import_jobs(&self) -> Collection<ImportJob> {
        self.db.collection(IMPORT_JOBS_COLLECTION)
    }

    pub fn transactions(&self) -> Collection<TransactionRecord> {
        self.db.collection(TRANSACTIONS_COLLECTION)
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }
}
