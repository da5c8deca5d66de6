//! `files`: every blob in a commit's tree with its content.

use super::{lookup, open_repo, pinned_commit, repository_column, Lookup, Row};
use crate::error::{self, Result as GitResult};
use crate::git::{GitRepo, TreeFile};
use devsql_vtab::{
    Args, ColumnDescriptor, Constraint, Cursor, IndexPlan, Operator, OrderBy, Planner, Result,
    TableDescriptor, TableModule, Value,
};
use std::path::PathBuf;
use std::vec;

const NAME: &str = "files";
const REV: usize = 1;
const COMMIT_HASH: usize = 2;

pub struct FilesTable {
    descriptor: TableDescriptor,
    default_repo: PathBuf,
}

impl FilesTable {
    pub fn new(default_repo: impl Into<PathBuf>) -> Result<Self> {
        let descriptor = TableDescriptor::new(
            NAME,
            vec![
                repository_column(),
                ColumnDescriptor::text("rev").hidden(),
                ColumnDescriptor::text("commit_hash")
                    .not_null()
                    .filter(&[Operator::Eq]),
                ColumnDescriptor::text("path").not_null(),
                ColumnDescriptor::text("content"),
                ColumnDescriptor::boolean("executable").not_null(),
            ],
        )?;
        Ok(Self {
            descriptor,
            default_repo: default_repo.into(),
        })
    }
}

impl TableModule for FilesTable {
    fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    fn plan(&self, constraints: &[Constraint], _order_by: &[OrderBy]) -> Result<IndexPlan> {
        let mut planner = Planner::new(&self.descriptor, constraints);
        planner.consume_hidden()?;
        if planner.consume_eq(COMMIT_HASH).is_some() {
            planner.point_access(1, "commit");
        } else {
            planner.scan_access(0, "tree", 10_000.0, 1_000);
        }
        Ok(planner.finish())
    }

    fn open(&self) -> Result<Box<dyn Cursor>> {
        Ok(Box::new(FilesCursor {
            default_repo: self.default_repo.clone(),
            repo: None,
            commit: String::new(),
            files: Vec::new().into_iter(),
            row: Row::default(),
        }))
    }
}

struct FilesCursor {
    default_repo: PathBuf,
    repo: Option<GitRepo>,
    commit: String,
    files: vec::IntoIter<TreeFile>,
    row: Row,
}

impl FilesCursor {
    fn load(&mut self, args: &Args) -> GitResult<()> {
        let Some(repo) = self.repo.as_ref() else {
            return Ok(());
        };
        let hash = match lookup(args, COMMIT_HASH) {
            Lookup::Any => None,
            Lookup::Exact(hash) => Some(hash),
            Lookup::Nothing => return Ok(()),
        };
        if let Some(id) = pinned_commit(repo, args.text(REV), hash)? {
            let commit = repo.find_commit(id)?;
            self.files = repo.tree_files(&commit)?.into_iter();
            self.commit = id.to_string();
        }
        Ok(())
    }

    fn advance(&mut self) -> GitResult<Option<Vec<Value>>> {
        let (Some(repo), Some(file)) = (self.repo.as_ref(), self.files.next()) else {
            return Ok(None);
        };
        let content = repo.blob_content(file.id)?;
        let content = match String::from_utf8(content) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Blob(e.into_bytes()),
        };
        Ok(Some(vec![
            Value::Text(self.commit.clone()),
            Value::Text(file.path),
            content,
            Value::bool(file.executable),
        ]))
    }
}

impl Cursor for FilesCursor {
    fn filter(&mut self, _plan: &IndexPlan, args: &Args) -> Result<()> {
        self.close();
        let (repo, repository) = open_repo(NAME, &self.default_repo, args)?;
        self.repo = Some(repo);
        self.load(args).map_err(error::source(NAME))?;
        self.row.reset(vec![
            repository,
            Value::Text(args.text(REV).unwrap_or("HEAD").to_string()),
        ]);
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
        self.repo = None;
        self.row.clear();
    }
}
