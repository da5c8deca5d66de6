//! Error types shared by every table adapter.

use thiserror::Error;

/// Result alias used throughout the cursor protocol.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while planning or driving a virtual table.
///
/// The variants fall into three groups that callers are expected to treat
/// differently:
///
/// - planning errors ([`Error::MissingArgument`], [`Error::InvalidArgument`],
///   [`Error::Unusable`]) are raised before any row is produced;
/// - source errors ([`Error::Source`]) abort a cursor mid-scan;
/// - cancellation ([`Error::Cancelled`]) unwinds a query that was stopped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    /// A required constraint exists but cannot be used in the current join order.
    #[error("constraint on {0} is not usable in this plan")]
    Unusable(String),

    #[error("{table}: {message}")]
    Source { table: String, message: String },

    #[error("canceled: {0}")]
    Cancelled(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("column {0} read without a current row")]
    NoCurrentRow(usize),

    #[error("column index {0} out of range")]
    ColumnOutOfRange(usize),

    #[error("invalid table descriptor {table}: {reason}")]
    Descriptor { table: String, reason: String },

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Builds an [`Error::InvalidArgument`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Builds an [`Error::Source`] attributed to `table`.
    pub fn source(table: impl Into<String>, message: impl ToString) -> Self {
        Error::Source {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// True for errors reported while compiling a plan, before any row exists.
    pub fn is_planning(&self) -> bool {
        matches!(
            self,
            Error::MissingArgument(_) | Error::InvalidArgument { .. } | Error::Unusable(_)
        )
    }

    /// True when the query was stopped rather than the source failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}
