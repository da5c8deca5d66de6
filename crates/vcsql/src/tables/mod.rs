//! Local repository tables.
//!
//! Every table takes an optional `repository` path as its first hidden
//! argument and opens its own repository handle in `filter`. The handle and
//! everything derived from it (trees, diffs, blame results) is dropped when
//! the cursor is exhausted or closed.

mod blame;
mod branches;
mod commits;
mod files;
mod stats;
mod tags;

pub use blame::BlameTable;
pub use branches::BranchesTable;
pub use commits::CommitsTable;
pub use files::FilesTable;
pub use stats::StatsTable;
pub use tags::TagsTable;

use crate::error::{self, Result};
use crate::git::{git_time, CommitWalk, GitRepo};
use devsql_vtab::{Args, ColumnDescriptor, Error, Value};
use git2::{Oid, Signature};
use std::path::{Path, PathBuf};

/// Column index of the `repository` argument in every local table.
pub(crate) const REPOSITORY: usize = 0;

pub(crate) fn repository_column() -> ColumnDescriptor {
    ColumnDescriptor::text("repository").hidden()
}

/// Opens the repository named by the `repository` argument, falling back to
/// `default`. Returns the handle and the value the hidden column reports.
pub(crate) fn open_repo(table: &str, default: &Path, args: &Args) -> devsql_vtab::Result<(GitRepo, Value)> {
    let path = args
        .text(REPOSITORY)
        .map(PathBuf::from)
        .unwrap_or_else(|| default.to_path_buf());
    let repo = GitRepo::open(&path).map_err(error::source(table))?;
    tracing::debug!(table, repo = %repo.path(), "repository opened");
    Ok((repo, Value::Text(path.display().to_string())))
}

/// The commits a cursor visits, together with the repository they come from:
/// a full walk, or at most one commit.
pub(crate) enum CommitSource {
    Walk(CommitWalk),
    Once(GitRepo, Option<Oid>),
}

impl CommitSource {
    pub(crate) fn walk(repo: GitRepo) -> Result<Self> {
        Ok(CommitSource::Walk(CommitWalk::from_head(repo)?))
    }

    pub(crate) fn repo(&self) -> &GitRepo {
        match self {
            CommitSource::Walk(walk) => walk.repo(),
            CommitSource::Once(repo, _) => repo,
        }
    }

    pub(crate) fn next_id(&mut self) -> Result<Option<Oid>> {
        match self {
            CommitSource::Walk(walk) => walk.next_id(),
            CommitSource::Once(_, id) => Ok(id.take()),
        }
    }
}

/// Value a plan bound for an optional hash lookup column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup<'a> {
    /// The plan binds nothing; every commit qualifies.
    Any,
    Exact(&'a str),
    /// NULL or a non-text value, which equals no hash.
    Nothing,
}

pub(crate) fn lookup(args: &Args, column: usize) -> Lookup<'_> {
    match args.bound(column) {
        None => Lookup::Any,
        Some(Value::Text(hash)) => Lookup::Exact(hash),
        Some(_) => Lookup::Nothing,
    }
}

/// Resolves a `commit_hash = ?` value. Only a full, lowercase object id can
/// equal a hash column, so anything else selects no commit.
pub(crate) fn exact_commit(repo: &GitRepo, hash: &str) -> Result<Option<Oid>> {
    match GitRepo::parse_full_id(hash) {
        Some(id) if id.to_string() == hash => Ok(Some(repo.find_commit(id)?.id())),
        _ => Ok(None),
    }
}

/// Picks the single commit named by a `rev` argument and/or a
/// `commit_hash` constraint. `None` means the two disagree or the hash
/// cannot exist.
pub(crate) fn pinned_commit(repo: &GitRepo, rev: Option<&str>, hash: Option<&str>) -> Result<Option<Oid>> {
    match (rev, hash) {
        (Some(rev), hash) => {
            let id = repo.resolve_commit(rev)?.id();
            Ok(hash.map_or(true, |h| h == id.to_string()).then_some(id))
        }
        (None, Some(hash)) => exact_commit(repo, hash),
        (None, None) => Ok(Some(repo.head_commit()?.id())),
    }
}

pub(crate) fn signature_values(sig: &Signature<'_>) -> [Value; 3] {
    [
        Value::from(sig.name()),
        Value::from(sig.email()),
        git_time(sig.when()).map(Value::timestamp).unwrap_or(Value::Null),
    ]
}

/// Hidden argument values plus the visible values of the current row.
#[derive(Debug, Default)]
pub(crate) struct Row {
    params: Vec<Value>,
    values: Option<Vec<Value>>,
}

impl Row {
    pub(crate) fn reset(&mut self, params: Vec<Value>) {
        self.params = params;
        self.values = None;
    }

    pub(crate) fn set(&mut self, values: Vec<Value>) {
        self.values = Some(values);
    }

    pub(crate) fn clear(&mut self) {
        self.values = None;
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.values.is_none()
    }

    pub(crate) fn column(&self, index: usize) -> devsql_vtab::Result<Value> {
        let values = self.values.as_ref().ok_or(Error::NoCurrentRow(index))?;
        if let Some(param) = self.params.get(index) {
            return Ok(param.clone());
        }
        values
            .get(index - self.params.len())
            .cloned()
            .ok_or(Error::ColumnOutOfRange(index))
    }
}
