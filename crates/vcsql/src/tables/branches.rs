//! `branches`: local and remote-tracking branches.

use super::{open_repo, repository_column, Row};
use crate::error::{self, Result as GitResult};
use crate::git::GitRepo;
use devsql_vtab::{
    Args, ColumnDescriptor, Constraint, Cursor, IndexPlan, OrderBy, Planner, Result,
    TableDescriptor, TableModule, Value,
};
use git2::BranchType;
use std::path::PathBuf;
use std::vec;

const NAME: &str = "branches";

pub struct BranchesTable {
    descriptor: TableDescriptor,
    default_repo: PathBuf,
}

impl BranchesTable {
    pub fn new(default_repo: impl Into<PathBuf>) -> Result<Self> {
        let descriptor = TableDescriptor::new(
            NAME,
            vec![
                repository_column(),
                ColumnDescriptor::text("name").not_null(),
                ColumnDescriptor::text("full_name").not_null(),
                ColumnDescriptor::text("hash"),
                ColumnDescriptor::text("symbolic_target"),
                ColumnDescriptor::boolean("is_remote").not_null(),
                ColumnDescriptor::boolean("is_head").not_null(),
            ],
        )?;
        Ok(Self {
            descriptor,
            default_repo: default_repo.into(),
        })
    }
}

impl TableModule for BranchesTable {
    fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    fn plan(&self, constraints: &[Constraint], _order_by: &[OrderBy]) -> Result<IndexPlan> {
        let mut planner = Planner::new(&self.descriptor, constraints);
        planner.consume_hidden()?;
        planner.scan_access(0, "refs/heads+refs/remotes", 1_000.0, 100);
        Ok(planner.finish())
    }

    fn open(&self) -> Result<Box<dyn Cursor>> {
        Ok(Box::new(BranchesCursor {
            default_repo: self.default_repo.clone(),
            repo: None,
            refs: Vec::new().into_iter(),
            row: Row::default(),
        }))
    }
}

struct BranchesCursor {
    default_repo: PathBuf,
    repo: Option<GitRepo>,
    refs: vec::IntoIter<(String, BranchType)>,
    row: Row,
}

impl BranchesCursor {
    fn advance(&mut self) -> GitResult<Option<Vec<Value>>> {
        let (Some(repo), Some((full_name, kind))) = (self.repo.as_ref(), self.refs.next()) else {
            return Ok(None);
        };
        let branch = repo.branch(&full_name, kind)?;
        Ok(Some(vec![
            Value::Text(branch.name),
            Value::Text(branch.full_name),
            Value::from(branch.target.map(|id| id.to_string())),
            Value::from(branch.symbolic_target),
            Value::bool(branch.is_remote),
            Value::bool(branch.is_head),
        ]))
    }
}

impl Cursor for BranchesCursor {
    fn filter(&mut self, _plan: &IndexPlan, args: &Args) -> Result<()> {
        self.close();
        let (repo, repository) = open_repo(NAME, &self.default_repo, args)?;
        self.refs = repo.branch_refs().map_err(error::source(NAME))?.into_iter();
        self.repo = Some(repo);
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
        self.refs = Vec::new().into_iter();
        self.repo = None;
        self.row.clear();
    }
}
