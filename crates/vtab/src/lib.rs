//! # devsql-vtab
//!
//! The adapter framework behind devsql's table-valued functions.
//!
//! A data source becomes a SQL table by implementing two traits:
//!
//! - [`TableModule`] describes the table ([`TableDescriptor`]) and turns the
//!   constraints and ORDER BY of one invocation into an [`IndexPlan`];
//! - [`Cursor`] produces rows for a plan in a single forward pass
//!   (`filter`, `next`, `eof`, `column`, `close`).
//!
//! Modules are collected in a [`Registry`] at startup and installed on a
//! `rusqlite::Connection` as eponymous virtual tables. Remote adapters share
//! a [`RateLimiter`] and observe query cancellation through [`QueryScope`].

pub mod cancel;
pub mod constraint;
pub mod cursor;
pub mod error;
pub mod harness;
pub mod plan;
pub mod rate_limit;
pub mod registry;
pub mod schema;
mod sqlite;
pub mod value;

pub use cancel::QueryScope;
pub use constraint::{Constraint, Operator, OrderBy};
pub use cursor::{Args, Cursor, TableModule};
pub use error::{Error, Result};
pub use plan::{ArgSlot, ConstraintUsage, IndexPlan, NativeOrder, Planner, POINT_COST, SCAN_COST};
pub use rate_limit::{acquire_permit, RateLimiter, TokenBucket, Unlimited};
pub use registry::Registry;
pub use schema::{ColumnDescriptor, ColumnType, OrderSupport, TableDescriptor};
pub use value::Value;

pub use tokio_util::sync::CancellationToken;
