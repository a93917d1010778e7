use crate::config::AppConfig;
use crate::error::AppError;
use crate::handlers;
use crate::services::{ImportJobStore, ImportService, MongoDb, StatisticsService};
use crate::workers::{ImportTask, ImportWorkerPool};
use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: MongoDb,
    pub jobs: ImportJobStore,
    pub import: Arc<ImportService>,
    pub statistics: StatisticsService,
    pub import_queue: mpsc::Sender<ImportTask>,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    pub async fn build(config: AppConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let jobs = ImportJobStore::new(db.clone());
        let import = Arc::new(ImportService::new(
            db.clone(),
            jobs.clone(),
            config.import.max_stored_errors,
        ));
        let statistics = StatisticsService::new(db.clone(), jobs.clone());

        let (worker_pool, import_queue) = ImportWorkerPool::new(config.import.clone(), import.clone());
        tokio::spawn(async move {
            worker_pool.start().await;
        });

        let state = AppState {
            config: config.clone(),
            db,
            jobs,
            import,
            statistics,
            import_queue,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route("/api/imports/:month", post(handlers::import_month))
            .route(
                "/api/imports/months/:month/status",
                get(handlers::import_status),
            )
            .route("/api/statistics", get(handlers::monthly_statistics))
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
            state,
        })
    }

    pub fn db(&self) -> &MongoDb {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
