//! Error types for vcsql.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VcsqlError>;

#[derive(Error, Debug)]
pub enum VcsqlError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("commit not found: {0}")]
    CommitNotFound(String),

    #[error("invalid revision {rev}: {reason}")]
    InvalidRevision { rev: String, reason: String },

    #[error("{path} is not a file in {rev}")]
    NotAFile { path: String, rev: String },
}

/// Converts into a cursor error attributed to `table`.
pub(crate) fn source(table: &str) -> impl Fn(VcsqlError) -> devsql_vtab::Error + '_ {
    move |err| devsql_vtab::Error::source(table, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_keeps_message() {
        let err = source("commits")(VcsqlError::CommitNotFound("abc123".into()));
        assert!(!err.is_planning());
        assert_eq!(err.to_string(), "commits: commit not found: abc123");
    }
}
