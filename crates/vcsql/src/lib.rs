//! # vcsql
//!
//! Query Git repositories using SQL.
//!
//! vcsql exposes a repository's history as virtual tables that any engine
//! driving the [`devsql_vtab`] cursor protocol can scan lazily: rows are
//! produced as the revision walk, diff or blame progresses, never
//! materialized up front.
//!
//! ## Quick Start
//!
//! ```no_run
//! use devsql_vtab::Registry;
//! use rusqlite::Connection;
//!
//! let mut registry = Registry::new();
//! registry.register_all(vcsql::modules(".")?)?;
//! let conn = Connection::open_in_memory()?;
//! registry.install(&conn)?;
//!
//! let mut stmt = conn.prepare("SELECT hash, summary FROM commits LIMIT 5")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Available Tables
//!
//! - **History**: `commits`, `stats`
//! - **Content**: `files`, `blame`
//! - **References**: `branches`, `tags`
//!
//! Every table accepts an optional repository path as its first argument,
//! e.g. `SELECT * FROM commits('/path/to/repo')`.

pub mod error;
pub mod git;
pub mod tables;

pub use error::{Result, VcsqlError};
pub use git::GitRepo;
pub use tables::{BlameTable, BranchesTable, CommitsTable, FilesTable, StatsTable, TagsTable};

use devsql_vtab::TableModule;
use std::path::PathBuf;
use std::sync::Arc;

/// Builds every local table, reading `default_repo` when a query does not
/// name a repository.
pub fn modules(default_repo: impl Into<PathBuf>) -> devsql_vtab::Result<Vec<Arc<dyn TableModule>>> {
    let repo = default_repo.into();
    Ok(vec![
        Arc::new(CommitsTable::new(repo.clone())?),
        Arc::new(StatsTable::new(repo.clone())?),
        Arc::new(BlameTable::new(repo.clone())?),
        Arc::new(FilesTable::new(repo.clone())?),
        Arc::new(TagsTable::new(repo.clone())?),
        Arc::new(BranchesTable::new(repo)?),
    ])
}
