//! `tags`: annotated and lightweight tags.

use super::{open_repo, repository_column, Row};
use crate::error::{self, Result as GitResult};
use crate::git::GitRepo;
use devsql_vtab::{
    Args, ColumnDescriptor, Constraint, Cursor, IndexPlan, OrderBy, Planner, Result,
    TableDescriptor, TableModule, Value,
};
use std::path::PathBuf;
use std::vec;

const NAME: &str = "tags";

pub struct TagsTable {
    descriptor: TableDescriptor,
    default_repo: PathBuf,
}

impl TagsTable {
    pub fn new(default_repo: impl Into<PathBuf>) -> Result<Self> {
        let descriptor = TableDescriptor::new(
            NAME,
            vec![
                repository_column(),
                ColumnDescriptor::text("full_name").not_null(),
                ColumnDescriptor::text("name").not_null(),
                ColumnDescriptor::text("hash"),
                ColumnDescriptor::text("target_type"),
                ColumnDescriptor::text("tagger_name"),
                ColumnDescriptor::text("tagger_email"),
                ColumnDescriptor::timestamp("tagger_when"),
                ColumnDescriptor::text("message"),
                ColumnDescriptor::boolean("is_annotated").not_null(),
            ],
        )?;
        Ok(Self {
            descriptor,
            default_repo: default_repo.into(),
        })
    }
}

impl TableModule for TagsTable {
    fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    fn plan(&self, constraints: &[Constraint], _order_by: &[OrderBy]) -> Result<IndexPlan> {
        let mut planner = Planner::new(&self.descriptor, constraints);
        planner.consume_hidden()?;
        planner.scan_access(0, "refs/tags", 1_000.0, 100);
        Ok(planner.finish())
    }

    fn open(&self) -> Result<Box<dyn Cursor>> {
        Ok(Box::new(TagsCursor {
            default_repo: self.default_repo.clone(),
            repo: None,
            refs: Vec::new().into_iter(),
            row: Row::default(),
        }))
    }
}

struct TagsCursor {
    default_repo: PathBuf,
    repo: Option<GitRepo>,
    refs: vec::IntoIter<String>,
    row: Row,
}

impl TagsCursor {
    fn advance(&mut self) -> GitResult<Option<Vec<Value>>> {
        let (Some(repo), Some(full_name)) = (self.repo.as_ref(), self.refs.next()) else {
            return Ok(None);
        };
        let tag = repo.tag(&full_name)?;
        let is_annotated = tag.annotation.is_some();
        let annotation = tag.annotation.unwrap_or_default();
        Ok(Some(vec![
            Value::Text(tag.full_name),
            Value::Text(tag.name),
            Value::from(tag.target.map(|id| id.to_string())),
            Value::from(annotation.target_type),
            Value::from(annotation.tagger_name),
            Value::from(annotation.tagger_email),
            annotation
                .tagger_when
                .map(Value::timestamp)
                .unwrap_or(Value::Null),
            Value::from(annotation.message),
            Value::bool(is_annotated),
        ]))
    }
}

impl Cursor for TagsCursor {
    fn filter(&mut self, _plan: &IndexPlan, args: &Args) -> Result<()> {
        self.close();
        let (repo, repository) = open_repo(NAME, &self.default_repo, args)?;
        self.refs = repo.tag_refs().map_err(error::source(NAME))?.into_iter();
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
