use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub mongodb: MongoConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    #[serde(default = "default_mongodb_uri")]
    pub uri: String,
    #[serde(default = "default_mongodb_database")]
    pub database: String,
}

/// Knobs for the background import worker pool and job bookkeeping.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    /// Upper bound on rejection messages retained per job document. The
    /// rejected-row count always reflects all rows regardless of this cap.
    #[serde(default = "default_max_stored_errors")]
    pub max_stored_errors: usize,
}

fn default_port() -> u16 {
    8080
}

fn default_mongodb_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongodb_database() -> String {
    "transactions_db".to_string()
}

fn default_worker_count() -> usize {
    2
}

fn default_queue_size() -> usize {
    50
}

fn default_max_stored_errors() -> usize {
    200
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: default_mongodb_uri(),
            database: default_mongodb_database(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_size: default_queue_size(),
            max_stored_errors: default_max_stored_errors(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
