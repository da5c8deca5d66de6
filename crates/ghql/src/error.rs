//! Error types for ghql.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GhqlError>;

#[derive(Error, Debug)]
pub enum GhqlError {
    #[error("GitHub token not configured")]
    MissingToken,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("remote API returned errors: {0}")]
    GraphQl(String),

    #[error("remote API returned partial data: {0}")]
    PartialData(String),

    #[error("response is missing {0}")]
    MissingField(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("pagination did not advance past cursor {0:?}")]
    Stalled(Option<String>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("remote tables block the calling thread and cannot be read from inside an async runtime")]
    InsideRuntime,

    #[error("{0}")]
    Cancelled(String),
}

impl GhqlError {
    /// Converts into a cursor error attributed to `table`; cancellation stays
    /// distinguishable from a failing source.
    pub fn into_vtab(self, table: &str) -> devsql_vtab::Error {
        match self {
            GhqlError::Cancelled(reason) => devsql_vtab::Error::Cancelled(reason),
            other => devsql_vtab::Error::source(table, other),
        }
    }
}
