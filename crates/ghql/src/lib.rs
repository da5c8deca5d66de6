//! # ghql
//!
//! GitHub's GraphQL connections as SQL table-valued functions.
//!
//! Each table wraps one connection (stargazers, issues, pull requests, ...)
//! and pages through it lazily while the SQL engine pulls rows. Every page
//! fetch first takes a permit from a shared [`devsql_vtab::RateLimiter`] and
//! observes the running query's cancellation token.
//!
//! ```sql
//! SELECT login, starred_at FROM github_stargazers('rust-lang/rust')
//! ORDER BY starred_at DESC LIMIT 10;
//!
//! SELECT hash, summary FROM github_repo_pr_commits('rust-lang', 'rust', 1);
//! ```

pub mod client;
pub mod context;
pub mod error;
pub mod identity;
pub mod pagination;
pub mod table;
pub mod tables;

pub use client::{GraphqlClient, HttpGraphqlClient, DEFAULT_ENDPOINT};
pub use context::GithubContext;
pub use error::{GhqlError, Result};
pub use identity::{Identity, ItemKind, RepoRef, Scope};
pub use table::{RemoteColumn, RemoteTable, TableSpec};

use devsql_vtab::TableModule;
use std::sync::Arc;

/// Builds every GitHub table over one shared context.
pub fn modules(ctx: Arc<GithubContext>) -> devsql_vtab::Result<Vec<Arc<dyn TableModule>>> {
    tables::all()
        .into_iter()
        .map(|spec| {
            let table = RemoteTable::new(spec, Arc::clone(&ctx))?;
            Ok(Arc::new(table) as Arc<dyn TableModule>)
        })
        .collect()
}
