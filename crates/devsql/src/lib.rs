//! DevSQL - SQL over Git repositories and GitHub
//!
//! This crate builds the table registry from vcsql (local repositories) and
//! ghql (GitHub's GraphQL API), installs it on an in-memory SQLite
//! connection and runs queries against it. Tables are table-valued
//! functions, so local and remote data join in a single statement:
//!
//! ```sql
//! SELECT c.hash, c.summary, p.number
//! FROM commits c
//! JOIN github_repo_pr_commits('rust-lang/rust', 1) p ON p.hash = c.hash;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod output;

pub use config::Config;
pub use engine::{Canceller, Engine, QueryResult, TableInfo};
pub use error::Error;

/// Result type for devsql operations
pub type Result<T> = std::result::Result<T, Error>;
