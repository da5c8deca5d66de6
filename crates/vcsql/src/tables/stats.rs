//! `stats`: per-file line counts for each commit, diffed against its first
//! parent with rename detection.

use super::{lookup, open_repo, pinned_commit, repository_column, CommitSource, Lookup, Row};
use crate::error::{self, Result as GitResult};
use crate::git::{FileStat, GitRepo};
use devsql_vtab::{
    Args, ColumnDescriptor, Constraint, Cursor, IndexPlan, Operator, OrderBy, Planner, Result,
    TableDescriptor, TableModule, Value,
};
use std::path::PathBuf;
use std::vec;

const NAME: &str = "stats";
const REV: usize = 1;
const COMMIT_HASH: usize = 2;

pub struct StatsTable {
    descriptor: TableDescriptor,
    default_repo: PathBuf,
}

impl StatsTable {
    pub fn new(default_repo: impl Into<PathBuf>) -> Result<Self> {
        let descriptor = TableDescriptor::new(
            NAME,
            vec![
                repository_column(),
                ColumnDescriptor::text("rev").hidden(),
                ColumnDescriptor::text("commit_hash")
                    .not_null()
                    .filter(&[Operator::Eq]),
                ColumnDescriptor::text("file_path").not_null(),
                ColumnDescriptor::text("old_file_path"),
                ColumnDescriptor::text("status").not_null(),
                ColumnDescriptor::integer("additions").not_null(),
                ColumnDescriptor::integer("deletions").not_null(),
            ],
        )?;
        Ok(Self {
            descriptor,
            default_repo: default_repo.into(),
        })
    }
}

impl TableModule for StatsTable {
    fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    fn plan(&self, constraints: &[Constraint], _order_by: &[OrderBy]) -> Result<IndexPlan> {
        let mut planner = Planner::new(&self.descriptor, constraints);
        planner.consume_hidden()?;
        let pinned = planner.consume_eq(COMMIT_HASH).is_some();
        if pinned || planner.consume_eq(REV).is_some() {
            planner.point_access(1, "commit");
        }
        Ok(planner.finish())
    }

    fn open(&self) -> Result<Box<dyn Cursor>> {
        Ok(Box::new(StatsCursor {
            default_repo: self.default_repo.clone(),
            commits: None,
            commit: String::new(),
            files: Vec::new().into_iter(),
            row: Row::default(),
        }))
    }
}

struct StatsCursor {
    default_repo: PathBuf,
    commits: Option<CommitSource>,
    commit: String,
    files: vec::IntoIter<FileStat>,
    row: Row,
}

impl StatsCursor {
    fn source(repo: GitRepo, args: &Args) -> GitResult<CommitSource> {
        let rev = args.text(REV);
        let hash = match lookup(args, COMMIT_HASH) {
            Lookup::Any => None,
            Lookup::Exact(hash) => Some(hash),
            Lookup::Nothing => return Ok(CommitSource::Once(repo, None)),
        };
        if rev.is_none() && hash.is_none() {
            return CommitSource::walk(repo);
        }
        let id = pinned_commit(&repo, rev, hash)?;
        Ok(CommitSource::Once(repo, id))
    }

    /// Moves to the next file, loading the next commit's diff whenever the
    /// current one has no files left. Commits without changes are skipped.
    fn advance(&mut self) -> GitResult<Option<Vec<Value>>> {
        let Some(commits) = self.commits.as_mut() else {
            return Ok(None);
        };
        loop {
            if let Some(stat) = self.files.next() {
                return Ok(Some(vec![
                    Value::Text(self.commit.clone()),
                    Value::Text(stat.path),
                    Value::from(stat.old_path),
                    Value::from(stat.status),
                    Value::Integer(stat.additions),
                    Value::Integer(stat.deletions),
                ]));
            }
            let Some(id) = commits.next_id()? else {
                return Ok(None);
            };
            let repo = commits.repo();
            let stats = repo.diff_stats(&repo.find_commit(id)?)?;
            tracing::trace!(commit = %id, files = stats.len(), "diff loaded");
            self.commit = id.to_string();
            self.files = stats.into_iter();
        }
    }
}

impl Cursor for StatsCursor {
    fn filter(&mut self, _plan: &IndexPlan, args: &Args) -> Result<()> {
        self.close();
        let (repo, repository) = open_repo(NAME, &self.default_repo, args)?;
        self.commits = Some(Self::source(repo, args).map_err(error::source(NAME))?);
        self.row.reset(vec![repository, Value::from(args.text(REV))]);
        self.next()
    }

    fn next(&mut self) -> Result<()> {
        match self.advance().map_err(error::source(NAME))? {
            Some(values) => self.row.set(values),
            None => self.close(),
        }
        Ok(())
    }

    fn eof(&self) -> bool {
        self.row.is_eof()
    }

    fn column(&self, index: usize) -> Result<Value> {
        self.row.column(index)
    }

    fn close(&mut self) {
        self.files = Vec::new().into_iter();
        self.commits = None;
        self.row.clear();
    }
}
