mod atomic;
mod error;
mod html;
mod json;
mod manager;
mod records;
mod summary;

pub use error::OutputError;
pub use manager::{OutputManager, ReportSettings};
pub use records::{ErrorRecord, OutcomeRecord};
pub use summary::RunSummary;
