//! Generic remote table: a GraphQL connection exposed through the cursor
//! protocol.

use crate::context::GithubContext;
use crate::error::{GhqlError, Result as GhqlResult};
use crate::identity::{Identity, Scope, LOGIN, NUMBER, OWNER, REPONAME};
use crate::pagination::{Page, PageSource, Paginator};
use devsql_vtab::{
    Args, CancellationToken, ColumnDescriptor, ColumnType, Constraint, Cursor, Error, IndexPlan,
    OrderBy, OrderSupport, Planner, Result, TableDescriptor, TableModule, Value,
};
use serde_json::{json, Map, Value as Json};
use std::sync::Arc;

/// Estimated cost of reading a connection from its first page.
const CONNECTION_COST: f64 = 1_000.0;

/// Where a column's value lives inside one edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
    /// JSON pointer into the edge, e.g. `/node/login`.
    Pointer(String),
    /// Collects `item` from every element of the array at `list` into a
    /// JSON array, e.g. label names.
    Pluck { list: String, item: String },
}

#[derive(Debug, Clone)]
pub struct RemoteColumn {
    pub descriptor: ColumnDescriptor,
    pub extract: Extract,
    /// GraphQL `orderBy` field that sorts the connection by this column.
    pub order_field: Option<&'static str>,
}

impl RemoteColumn {
    pub fn new(descriptor: ColumnDescriptor, extract: Extract) -> Self {
        Self {
            descriptor,
            extract,
            order_field: None,
        }
    }

    pub fn text(name: &str, pointer: impl Into<String>) -> Self {
        Self::new(ColumnDescriptor::text(name), Extract::Pointer(pointer.into()))
    }

    pub fn integer(name: &str, pointer: impl Into<String>) -> Self {
        Self::new(ColumnDescriptor::integer(name), Extract::Pointer(pointer.into()))
    }

    pub fn boolean(name: &str, pointer: impl Into<String>) -> Self {
        Self::new(ColumnDescriptor::boolean(name), Extract::Pointer(pointer.into()))
    }

    pub fn timestamp(name: &str, pointer: impl Into<String>) -> Self {
        Self::new(ColumnDescriptor::timestamp(name), Extract::Pointer(pointer.into()))
    }

    pub fn list(name: &str, list: impl Into<String>, item: impl Into<String>) -> Self {
        Self::new(
            ColumnDescriptor::json(name),
            Extract::Pluck {
                list: list.into(),
                item: item.into(),
            },
        )
    }

    /// Lets the API sort by this column in either direction.
    pub fn order(mut self, field: &'static str) -> Self {
        self.descriptor = self.descriptor.order(OrderSupport::Both);
        self.order_field = Some(field);
        self
    }

    /// Reads this column from an edge. Missing fields read as NULL.
    pub fn extract(&self, edge: &Json) -> Value {
        match &self.extract {
            Extract::Pointer(pointer) => match edge.pointer(pointer) {
                Some(json) => convert(self.descriptor.ty, json),
                None => Value::Null,
            },
            Extract::Pluck { list, item } => match edge.pointer(list).and_then(Json::as_array) {
                Some(items) => {
                    let names: Vec<Json> = items
                        .iter()
                        .filter_map(|i| i.pointer(item))
                        .filter(|v| !v.is_null())
                        .cloned()
                        .collect();
                    Value::json(&Json::Array(names))
                }
                None => Value::Null,
            },
        }
    }
}

fn convert(ty: ColumnType, json: &Json) -> Value {
    match (ty, json) {
        (_, Json::Null) => Value::Null,
        (ColumnType::Text, Json::String(s)) => Value::Text(s.clone()),
        (ColumnType::Text, Json::Number(n)) => Value::Text(n.to_string()),
        (ColumnType::Text, Json::Bool(b)) => Value::Text(b.to_string()),
        (ColumnType::Integer, Json::Number(n)) => n.as_i64().map(Value::Integer).unwrap_or(Value::Null),
        (ColumnType::Integer | ColumnType::Boolean, Json::Bool(b)) => Value::bool(*b),
        (ColumnType::Real, Json::Number(n)) => n.as_f64().map(Value::Real).unwrap_or(Value::Null),
        (ColumnType::Timestamp, Json::String(s)) => Value::parse_timestamp(s),
        (ColumnType::Json | ColumnType::Text, other) => Value::json(other),
        _ => Value::Null,
    }
}

/// Static definition of one remote table.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: &'static str,
    pub scope: Scope,
    /// GraphQL document taking `$perPage`, `$cursor`, the scope's identity
    /// variables and, when any column is orderable, `$orderBy`.
    pub document: &'static str,
    /// Fields leading from `data` to the connection, each with the noun
    /// reported when it resolves to null.
    pub connection: &'static [(&'static str, &'static str)],
    pub columns: Vec<RemoteColumn>,
}

impl TableSpec {
    pub fn is_orderable(&self) -> bool {
        self.columns.iter().any(|c| c.order_field.is_some())
    }
}

/// A [`TableModule`] serving one [`TableSpec`].
pub struct RemoteTable {
    spec: Arc<TableSpec>,
    descriptor: TableDescriptor,
    ctx: Arc<GithubContext>,
}

impl RemoteTable {
    pub fn new(spec: TableSpec, ctx: Arc<GithubContext>) -> Result<Self> {
        let mut columns = spec.scope.columns();
        columns.extend(spec.columns.iter().map(|c| c.descriptor.clone()));
        let descriptor = TableDescriptor::new(spec.name, columns)?;
        Ok(Self {
            spec: Arc::new(spec),
            descriptor,
            ctx,
        })
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn order_field(&self, column: usize) -> Option<String> {
        let visible = column.checked_sub(self.descriptor.arity())?;
        self.spec.columns.get(visible)?.order_field.map(str::to_string)
    }
}

impl TableModule for RemoteTable {
    fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    fn plan(&self, constraints: &[Constraint], order_by: &[OrderBy]) -> Result<IndexPlan> {
        let mut planner = Planner::new(&self.descriptor, constraints);

        let mut present = Vec::with_capacity(self.descriptor.arity());
        let mut known = Vec::with_capacity(self.descriptor.arity());
        let mut values_known = true;
        for column in 0..self.descriptor.arity() {
            let constraint = planner.consume_arg(column)?;
            present.push(constraint.is_some());
            values_known &= constraint.map_or(true, |c| c.value.is_some());
            known.push(constraint.and_then(|c| c.value.as_ref()));
        }

        match self.spec.scope {
            Scope::Login => {
                planner.require_eq(LOGIN)?;
            }
            Scope::Repository => {
                planner.require_eq(OWNER)?;
            }
            Scope::Item(_) => {
                planner.require_eq(OWNER)?;
                if !present[REPONAME] && !present[NUMBER] {
                    return Err(Error::MissingArgument("number".into()));
                }
            }
        }
        // Literal arguments are checked now; values bound later are
        // checked in `filter` before anything is fetched.
        if values_known {
            Identity::resolve(self.spec.scope, &known)?;
        }

        planner.scan_access(1, self.spec.name, CONNECTION_COST, self.ctx.per_page() as i64);
        planner.order_by(order_by, |column| self.order_field(column));
        Ok(planner.finish())
    }

    fn open(&self) -> Result<Box<dyn Cursor>> {
        Ok(Box::new(RemoteCursor {
            spec: Arc::clone(&self.spec),
            ctx: Arc::clone(&self.ctx),
            arity: self.descriptor.arity(),
            hidden: Vec::new(),
            pages: None,
        }))
    }
}

/// Fetches pages of one connection for one identity.
pub struct ConnectionSource {
    spec: Arc<TableSpec>,
    ctx: Arc<GithubContext>,
    variables: Map<String, Json>,
    cancel: CancellationToken,
}

impl PageSource for ConnectionSource {
    fn fetch(&mut self, after: Option<&str>) -> GhqlResult<Page> {
        let mut variables = self.variables.clone();
        variables.insert("cursor".into(), after.map_or(Json::Null, |a| json!(a)));
        tracing::debug!(
            table = self.spec.name,
            per_page = self.ctx.per_page(),
            cursor = ?after,
            "fetching page"
        );

        let data = self
            .ctx
            .fetch(self.spec.document, &Json::Object(variables), &self.cancel)?;
        let connection = locate(&data, self.spec.connection)?;
        parse_page(connection)
    }
}

fn locate<'a>(data: &'a Json, path: &[(&str, &str)]) -> GhqlResult<&'a Json> {
    let mut node = data;
    let mut walked = Vec::with_capacity(path.len());
    for (field, noun) in path {
        walked.push(*field);
        match node.get(*field) {
            None => return Err(GhqlError::MissingField(walked.join("."))),
            Some(Json::Null) => return Err(GhqlError::NotFound((*noun).to_string())),
            Some(next) => node = next,
        }
    }
    Ok(node)
}

fn parse_page(connection: &Json) -> GhqlResult<Page> {
    let edges = connection
        .get("edges")
        .and_then(Json::as_array)
        .ok_or_else(|| GhqlError::MissingField("edges".into()))?;
    let page_info = connection
        .get("pageInfo")
        .ok_or_else(|| GhqlError::MissingField("pageInfo".into()))?;
    let has_next_page = page_info
        .get("hasNextPage")
        .and_then(Json::as_bool)
        .ok_or_else(|| GhqlError::MissingField("pageInfo.hasNextPage".into()))?;
    let end_cursor = page_info
        .get("endCursor")
        .and_then(Json::as_str)
        .map(str::to_string);

    Ok(Page {
        edges: edges.iter().filter(|e| !e.is_null()).cloned().collect(),
        end_cursor,
        has_next_page,
    })
}

struct RemoteCursor {
    spec: Arc<TableSpec>,
    ctx: Arc<GithubContext>,
    arity: usize,
    hidden: Vec<Value>,
    pages: Option<Paginator<ConnectionSource>>,
}

impl RemoteCursor {
    fn variables(&self, identity: &Identity, plan: &IndexPlan) -> Map<String, Json> {
        let mut variables = identity.variables();
        variables.insert("perPage".into(), json!(self.ctx.per_page()));
        if self.spec.is_orderable() {
            let order = plan.native_order.as_ref().map_or(Json::Null, |order| {
                json!({
                    "field": order.field,
                    "direction": if order.desc { "DESC" } else { "ASC" },
                })
            });
            variables.insert("orderBy".into(), order);
        }
        variables
    }
}

impl Cursor for RemoteCursor {
    fn filter(&mut self, plan: &IndexPlan, args: &Args) -> Result<()> {
        self.close();
        let values: Vec<Option<&Value>> = (0..self.arity).map(|i| args.get(i)).collect();
        let identity = Identity::resolve(self.spec.scope, &values)?;

        let source = ConnectionSource {
            spec: Arc::clone(&self.spec),
            ctx: Arc::clone(&self.ctx),
            variables: self.variables(&identity, plan),
            cancel: self.ctx.token(),
        };
        let mut pages = Paginator::new(source);
        let started = pages.start();
        self.hidden = identity.hidden_values();
        self.pages = Some(pages);
        started.map_err(|e| e.into_vtab(self.spec.name))
    }

    fn next(&mut self) -> Result<()> {
        match self.pages.as_mut() {
            Some(pages) => pages.advance().map_err(|e| e.into_vtab(self.spec.name)),
            None => Ok(()),
        }
    }

    fn eof(&self) -> bool {
        self.pages.as_ref().map_or(true, Paginator::is_eof)
    }

    fn column(&self, index: usize) -> Result<Value> {
        let edge = self
            .pages
            .as_ref()
            .and_then(Paginator::current)
            .ok_or(Error::NoCurrentRow(index))?;
        if index < self.arity {
            return Ok(self.hidden.get(index).cloned().unwrap_or(Value::Null));
        }
        self.spec
            .columns
            .get(index - self.arity)
            .map(|c| c.extract(edge))
            .ok_or(Error::ColumnOutOfRange(index))
    }

    fn close(&mut self) {
        self.pages = None;
        self.hidden.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_pointer_and_types() {
        let edge = json!({
            "starredAt": "2024-01-02T03:04:05Z",
            "node": { "login": "octocat", "followers": { "totalCount": 12 }, "isHireable": true }
        });
        assert_eq!(
            RemoteColumn::timestamp("starred_at", "/starredAt").extract(&edge),
            Value::from("2024-01-02T03:04:05Z")
        );
        assert_eq!(
            RemoteColumn::text("login", "/node/login").extract(&edge),
            Value::from("octocat")
        );
        assert_eq!(
            RemoteColumn::integer("followers", "/node/followers/totalCount").extract(&edge),
            Value::Integer(12)
        );
        assert_eq!(
            RemoteColumn::boolean("hireable", "/node/isHireable").extract(&edge),
            Value::Integer(1)
        );
        assert_eq!(
            RemoteColumn::text("company", "/node/company").extract(&edge),
            Value::Null
        );
    }

    #[test]
    fn test_extract_list_as_json_array() {
        let edge = json!({
            "node": { "labels": { "nodes": [{ "name": "bug" }, { "name": "p1" }] } }
        });
        assert_eq!(
            RemoteColumn::list("labels", "/node/labels/nodes", "/name").extract(&edge),
            Value::from(r#"["bug","p1"]"#)
        );
        assert_eq!(
            RemoteColumn::list("labels", "/node/missing", "/name").extract(&edge),
            Value::Null
        );
    }

    #[test]
    fn test_locate_reports_null_and_missing() {
        let data = json!({ "repository": null });
        let path = &[("repository", "repository"), ("issues", "issues")];
        assert_eq!(
            locate(&data, path).unwrap_err().to_string(),
            "repository not found"
        );

        let data = json!({ "repository": {} });
        assert_eq!(
            locate(&data, path).unwrap_err().to_string(),
            "response is missing repository.issues"
        );
    }

    #[test]
    fn test_parse_page() {
        let page = parse_page(&json!({
            "edges": [{ "node": { "n": 1 } }, null],
            "pageInfo": { "endCursor": "abc", "hasNextPage": true }
        }))
        .unwrap();
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.end_cursor.as_deref(), Some("abc"));
        assert!(page.has_next_page);

        assert!(parse_page(&json!({ "edges": [] })).is_err());
    }
}
