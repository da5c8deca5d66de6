//! `commits`: every commit reachable from HEAD, newest first.

use super::{
    exact_commit, lookup, open_repo, repository_column, signature_values, CommitSource, Lookup, Row,
};
use crate::error::{self, Result as GitResult};
use crate::git::GitRepo;
use devsql_vtab::{
    Args, ColumnDescriptor, Constraint, Cursor, IndexPlan, Operator, OrderBy, Planner, Result,
    TableDescriptor, TableModule, Value,
};
use git2::Commit;
use std::path::PathBuf;

const NAME: &str = "commits";
const HASH: usize = 1;

pub struct CommitsTable {
    descriptor: TableDescriptor,
    default_repo: PathBuf,
}

impl CommitsTable {
    pub fn new(default_repo: impl Into<PathBuf>) -> Result<Self> {
        let descriptor = TableDescriptor::new(
            NAME,
            vec![
                repository_column(),
                ColumnDescriptor::text("hash").not_null().filter(&[Operator::Eq]),
                ColumnDescriptor::text("message"),
                ColumnDescriptor::text("summary"),
                ColumnDescriptor::text("author_name"),
                ColumnDescriptor::text("author_email"),
                ColumnDescriptor::timestamp("author_when"),
                ColumnDescriptor::text("committer_name"),
                ColumnDescriptor::text("committer_email"),
                ColumnDescriptor::timestamp("committer_when"),
                ColumnDescriptor::text("parent_id"),
                ColumnDescriptor::integer("parents").not_null(),
                ColumnDescriptor::text("tree_id").not_null(),
            ],
        )?;
        Ok(Self {
            descriptor,
            default_repo: default_repo.into(),
        })
    }
}

impl TableModule for CommitsTable {
    fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    fn plan(&self, constraints: &[Constraint], _order_by: &[OrderBy]) -> Result<IndexPlan> {
        let mut planner = Planner::new(&self.descriptor, constraints);
        planner.consume_hidden()?;
        if planner.consume_eq(HASH).is_some() {
            planner.point_access(1, "hash");
        }
        Ok(planner.finish())
    }

    fn open(&self) -> Result<Box<dyn Cursor>> {
        Ok(Box::new(CommitsCursor {
            default_repo: self.default_repo.clone(),
            commits: None,
            row: Row::default(),
        }))
    }
}

struct CommitsCursor {
    default_repo: PathBuf,
    commits: Option<CommitSource>,
    row: Row,
}

impl CommitsCursor {
    fn source(repo: GitRepo, args: &Args) -> GitResult<CommitSource> {
        match lookup(args, HASH) {
            Lookup::Any => CommitSource::walk(repo),
            Lookup::Exact(hash) => {
                let id = exact_commit(&repo, hash)?;
                Ok(CommitSource::Once(repo, id))
            }
            Lookup::Nothing => Ok(CommitSource::Once(repo, None)),
        }
    }

    fn advance(&mut self) -> GitResult<Option<Vec<Value>>> {
        let Some(commits) = self.commits.as_mut() else {
            return Ok(None);
        };
        let Some(id) = commits.next_id()? else {
            return Ok(None);
        };
        let commit = commits.repo().find_commit(id)?;
        Ok(Some(commit_values(&commit)))
    }
}

impl Cursor for CommitsCursor {
    fn filter(&mut self, _plan: &IndexPlan, args: &Args) -> Result<()> {
        self.close();
        let (repo, repository) = open_repo(NAME, &self.default_repo, args)?;
        self.commits = Some(Self::source(repo, args).map_err(error::source(NAME))?);
        self.row.reset(vec![repository]);
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
        self.commits = None;
        self.row.clear();
    }
}

fn commit_values(commit: &Commit<'_>) -> Vec<Value> {
    let [author_name, author_email, author_when] = signature_values(&commit.author());
    let [committer_name, committer_email, committer_when] = signature_values(&commit.committer());
    vec![
        Value::Text(commit.id().to_string()),
        Value::from(commit.message()),
        Value::from(commit.summary()),
        author_name,
        author_email,
        author_when,
        committer_name,
        committer_email,
        committer_when,
        Value::from(commit.parent_id(0).ok().map(|id| id.to_string())),
        Value::from(commit.parent_count()),
        Value::Text(commit.tree_id().to_string()),
    ]
}
