//! Identity arguments of remote tables and their calling conventions.
//!
//! Repository-scoped tables accept `t('owner/name')` or `t('owner', 'name')`.
//! Item-scoped tables add a number: `t('owner/name', 7)` or
//! `t('owner', 'name', 7)`; the type of the second argument (integer or
//! text) tells the two forms apart. Both forms normalize to the same
//! [`Identity`] before any request is made.

use devsql_vtab::{ColumnDescriptor, Error, Result, Value};
use serde_json::{json, Map, Value as Json};

/// The kind of item an item-scoped table addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    PullRequest,
    Issue,
}

impl ItemKind {
    fn noun(self) -> &'static str {
        match self {
            ItemKind::PullRequest => "pull request",
            ItemKind::Issue => "issue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Repository,
    Item(ItemKind),
    Login,
}

pub(crate) const OWNER: usize = 0;
pub(crate) const REPONAME: usize = 1;
pub(crate) const NUMBER: usize = 2;
pub(crate) const LOGIN: usize = 0;

impl Scope {
    /// Hidden columns carrying the identity arguments, in call order.
    pub fn columns(self) -> Vec<ColumnDescriptor> {
        match self {
            Scope::Repository => vec![
                ColumnDescriptor::text("owner").hidden(),
                ColumnDescriptor::text("reponame").hidden(),
            ],
            Scope::Item(_) => vec![
                ColumnDescriptor::text("owner").hidden(),
                ColumnDescriptor::text("reponame").hidden(),
                ColumnDescriptor::integer("number").hidden(),
            ],
            Scope::Login => vec![ColumnDescriptor::text("login").hidden()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

/// Normalized identity of one table invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Repository(RepoRef),
    Item(RepoRef, i64),
    Login(String),
}

impl Identity {
    /// Resolves the hidden argument values of a call; `values[i]` is the
    /// value bound to hidden column `i`, if any.
    pub fn resolve(scope: Scope, values: &[Option<&Value>]) -> Result<Self> {
        let arg = |i: usize| values.get(i).copied().flatten().filter(|v| !v.is_null());
        match scope {
            Scope::Login => {
                let login = text(arg(LOGIN), "login")?;
                if login.is_empty() {
                    return Err(Error::invalid("login", "must not be empty"));
                }
                Ok(Identity::Login(login.to_string()))
            }
            Scope::Repository => {
                let repo = repo_ref(arg(OWNER), arg(REPONAME))?;
                Ok(Identity::Repository(repo))
            }
            Scope::Item(kind) => {
                let (repo, number) = match arg(REPONAME) {
                    Some(Value::Integer(n)) => {
                        if arg(NUMBER).is_some() {
                            return Err(ambiguous());
                        }
                        (repo_ref(arg(OWNER), None)?, Some(*n))
                    }
                    reponame => (
                        repo_ref(arg(OWNER), reponame)?,
                        arg(NUMBER).map(|v| integer(v, "number")).transpose()?,
                    ),
                };
                let number = number.ok_or_else(|| Error::MissingArgument("number".into()))?;
                if number <= 0 {
                    return Err(Error::invalid("number", format!("invalid {} number", kind.noun())));
                }
                Ok(Identity::Item(repo, number))
            }
        }
    }

    /// GraphQL variables naming the addressed resource.
    pub fn variables(&self) -> Map<String, Json> {
        let mut vars = Map::new();
        match self {
            Identity::Repository(repo) => {
                vars.insert("owner".into(), json!(repo.owner));
                vars.insert("name".into(), json!(repo.name));
            }
            Identity::Item(repo, number) => {
                vars.insert("owner".into(), json!(repo.owner));
                vars.insert("name".into(), json!(repo.name));
                vars.insert("number".into(), json!(number));
            }
            Identity::Login(login) => {
                vars.insert("login".into(), json!(login));
            }
        }
        vars
    }

    /// Values reported by the hidden columns, in the two-argument form.
    pub fn hidden_values(&self) -> Vec<Value> {
        match self {
            Identity::Repository(repo) => vec![
                Value::Text(repo.owner.clone()),
                Value::Text(repo.name.clone()),
            ],
            Identity::Item(repo, number) => vec![
                Value::Text(repo.owner.clone()),
                Value::Text(repo.name.clone()),
                Value::Integer(*number),
            ],
            Identity::Login(login) => vec![Value::Text(login.clone())],
        }
    }
}

fn ambiguous() -> Error {
    Error::invalid(
        "owner",
        "ambiguous repository: pass either 'owner/name' or owner and name separately",
    )
}

fn text<'v>(value: Option<&'v Value>, name: &str) -> Result<&'v str> {
    match value {
        Some(Value::Text(s)) => Ok(s),
        Some(other) => Err(Error::invalid(
            name,
            format!("expected text, got {}", other.type_name()),
        )),
        None => Err(Error::MissingArgument(name.into())),
    }
}

fn integer(value: &Value, name: &str) -> Result<i64> {
    value.as_i64().ok_or_else(|| {
        Error::invalid(name, format!("expected integer, got {}", value.type_name()))
    })
}

fn repo_ref(owner: Option<&Value>, reponame: Option<&Value>) -> Result<RepoRef> {
    let owner = text(owner, "owner")?;
    match reponame {
        Some(reponame) => {
            if owner.contains('/') {
                return Err(ambiguous());
            }
            let name = text(Some(reponame), "reponame")?;
            if owner.is_empty() || name.is_empty() {
                return Err(Error::invalid("owner", "owner and name must not be empty"));
            }
            Ok(RepoRef {
                owner: owner.to_string(),
                name: name.to_string(),
            })
        }
        None => split(owner),
    }
}

/// Splits `owner/name`; exactly one `/` with non-empty parts.
fn split(full: &str) -> Result<RepoRef> {
    match full.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(RepoRef {
                owner: owner.to_string(),
                name: name.to_string(),
            })
        }
        _ => Err(Error::invalid(
            "owner",
            format!("expected 'owner/name', got '{}'", full),
        )),
    }
}
