//! `blame`: the commit that last touched every line of every file.

use super::{open_repo, repository_column, Row};
use crate::error::{self, Result as GitResult};
use crate::git::{BlameLine, GitRepo, TreeFile};
use devsql_vtab::{
    Args, ColumnDescriptor, Constraint, Cursor, IndexPlan, OrderBy, Planner, Result,
    TableDescriptor, TableModule, Value,
};
use git2::Oid;
use std::path::PathBuf;
use std::vec;

const NAME: &str = "blame";
const REV: usize = 1;

pub struct BlameTable {
    descriptor: TableDescriptor,
    default_repo: PathBuf,
}

impl BlameTable {
    pub fn new(default_repo: impl Into<PathBuf>) -> Result<Self> {
        let descriptor = TableDescriptor::new(
            NAME,
            vec![
                repository_column(),
                ColumnDescriptor::text("rev").hidden(),
                ColumnDescriptor::text("path").not_null(),
                ColumnDescriptor::integer("line_no").not_null(),
                ColumnDescriptor::text("commit_hash"),
                ColumnDescriptor::text("line").not_null(),
            ],
        )?;
        Ok(Self {
            descriptor,
            default_repo: default_repo.into(),
        })
    }
}

impl TableModule for BlameTable {
    fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    fn plan(&self, constraints: &[Constraint], _order_by: &[OrderBy]) -> Result<IndexPlan> {
        let mut planner = Planner::new(&self.descriptor, constraints);
        planner.consume_hidden()?;
        Ok(planner.finish())
    }

    fn open(&self) -> Result<Box<dyn Cursor>> {
        Ok(Box::new(BlameCursor {
            default_repo: self.default_repo.clone(),
            repo: None,
            commit: Oid::zero(),
            files: Vec::new().into_iter(),
            path: String::new(),
            lines: Vec::new().into_iter(),
            row: Row::default(),
        }))
    }
}

/// Walks files in tree order. Only one file's blame is held at a time;
/// loading the next file replaces the previous working set.
struct BlameCursor {
    default_repo: PathBuf,
    repo: Option<GitRepo>,
    commit: Oid,
    files: vec::IntoIter<TreeFile>,
    path: String,
    lines: vec::IntoIter<BlameLine>,
    row: Row,
}

impl BlameCursor {
    fn load(&mut self, rev: &str) -> GitResult<()> {
        let Some(repo) = self.repo.as_ref() else {
            return Ok(());
        };
        let commit = repo.resolve_commit(rev)?;
        self.files = repo.tree_files(&commit)?.into_iter();
        self.commit = commit.id();
        Ok(())
    }

    /// Empty files yield no rows; the loop moves straight to the next file.
    fn advance(&mut self) -> GitResult<Option<Vec<Value>>> {
        let Some(repo) = self.repo.as_ref() else {
            return Ok(None);
        };
        loop {
            if let Some(line) = self.lines.next() {
                return Ok(Some(vec![
                    Value::Text(self.path.clone()),
                    Value::Integer(line.line_no),
                    Value::from(line.commit.map(|id| id.to_string())),
                    Value::Text(line.text),
                ]));
            }
            let Some(file) = self.files.next() else {
                return Ok(None);
            };
            let lines = repo.blame_file(self.commit, &file)?;
            tracing::debug!(path = %file.path, lines = lines.len(), "blame working set");
            self.lines = lines.into_iter();
            self.path = file.path;
        }
    }
}

impl Cursor for BlameCursor {
    fn filter(&mut self, _plan: &IndexPlan, args: &Args) -> Result<()> {
        self.close();
        let rev = args.text(REV).unwrap_or("HEAD").to_string();
        let (repo, repository) = open_repo(NAME, &self.default_repo, args)?;
        self.repo = Some(repo);
        self.load(&rev).map_err(error::source(NAME))?;
        self.row.reset(vec![repository, Value::Text(rev)]);
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
        self.lines = Vec::new().into_iter();
        self.files = Vec::new().into_iter();
        self.repo = None;
        self.row.clear();
    }
}
