//! Error types for devsql

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error(transparent)]
    Table(#[from] devsql_vtab::Error),

    #[error("GitHub client error: {0}")]
    Github(#[from] ghql::GhqlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("query canceled")]
    Cancelled,
}
