//! Error types for the migration pipeline.

use crate::category::Category;
use thiserror::Error;

/// Migration errors
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Invalid rule export: {0}")]
    Format(String),
    #[error("Duplicate server id '{id}' in {category} lookup table")]
    DuplicateLookupKey { category: Category, id: String },
    #[error("Unknown category '{0}' in cloud index")]
    UnknownCategory(String),
    #[error("Jira returned status {status} for {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
