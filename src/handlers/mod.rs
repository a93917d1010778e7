pub mod health;
pub mod imports;
pub mod statistics;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use imports::{import_month, import_status};
pub use statistics::monthly_statistics;
