pub mod import_job;
pub mod period;
pub mod serde_helpers;
pub mod transaction;

pub use import_job::{ImportJob, ImportJobState};
pub use period::{ParsePeriodError, Period};
pub use transaction::TransactionRecord;
