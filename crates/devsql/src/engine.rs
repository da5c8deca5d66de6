//! Query engine: every table module installed on one SQLite connection.

use crate::{Config, Error, Result};
use devsql_vtab::{QueryScope, Registry, TokenBucket, Value};
use ghql::{GithubContext, GraphqlClient, HttpGraphqlClient};
use rusqlite::{Connection, InterruptHandle};
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Rows of a finished query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// All values of the named column, in row order.
    pub fn column(&self, name: &str) -> Vec<Value> {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => self.rows.iter().map(|r| r[idx].clone()).collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A registered table and its columns; hidden columns are the arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub arguments: Vec<String>,
    pub columns: Vec<String>,
}

/// Stops the running query from another thread.
#[derive(Clone)]
pub struct Canceller {
    scope: QueryScope,
    interrupt: Arc<InterruptHandle>,
}

impl Canceller {
    /// Aborts pending rate-limit waits and HTTP requests, then interrupts
    /// SQLite so local scans stop too.
    pub fn cancel(&self) {
        self.scope.cancel();
        self.interrupt.interrupt();
    }
}

/// An in-memory SQLite connection with every local and GitHub table installed.
///
/// Queries block the calling thread while remote pages are fetched on the
/// engine's own runtime. Call `query` and `stream` from a plain thread (or
/// `spawn_blocking`); from inside an async runtime remote tables fail with
/// an error instead of a nested `block_on`.
pub struct Engine {
    conn: Connection,
    registry: Registry,
    scope: QueryScope,
    runtime: Arc<Runtime>,
}

impl Engine {
    /// Builds an engine talking to the configured GitHub endpoint.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = HttpGraphqlClient::new(config.github_endpoint.clone(), config.github_token.clone())?;
        Self::with_client(config, Arc::new(client))
    }

    /// Builds an engine whose remote tables use `client`.
    pub fn with_client(config: Config, client: Arc<dyn GraphqlClient>) -> Result<Self> {
        config.validate()?;
        let runtime = Arc::new(
            Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("devsql-remote")
                .enable_all()
                .build()?,
        );
        let scope = QueryScope::new();
        let limiter = {
            let _guard = runtime.enter();
            Arc::new(TokenBucket::new(config.github_rate, config.github_burst))
        };
        let github = Arc::new(GithubContext::new(
            Arc::clone(&runtime),
            client,
            limiter,
            scope.clone(),
            config.github_per_page,
        ));

        let mut registry = Registry::new();
        registry.register_all(vcsql::modules(config.repo.clone())?)?;
        registry.register_all(ghql::modules(github)?)?;

        let conn = Connection::open_in_memory()?;
        registry.install(&conn)?;
        tracing::debug!(
            tables = registry.len(),
            repo = %config.repo.display(),
            "engine ready"
        );

        Ok(Self {
            conn,
            registry,
            scope,
            runtime,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runtime driving remote I/O; also usable for signal handling.
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn canceller(&self) -> Canceller {
        Canceller {
            scope: self.scope.clone(),
            interrupt: Arc::new(self.conn.get_interrupt_handle()),
        }
    }

    /// Registered tables in name order.
    pub fn tables(&self) -> Vec<TableInfo> {
        self.registry
            .modules()
            .map(|module| {
                let descriptor = module.descriptor();
                let (arguments, columns): (Vec<_>, Vec<_>) =
                    descriptor.columns.iter().partition(|c| c.hidden);
                TableInfo {
                    name: descriptor.name.clone(),
                    arguments: arguments.into_iter().map(|c| c.name.clone()).collect(),
                    columns: columns.into_iter().map(|c| c.name.clone()).collect(),
                }
            })
            .collect()
    }

    /// Runs `sql` and collects every row.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let mut rows = Vec::new();
        let columns = self.stream(sql, |_, row| {
            rows.push(row);
            Ok(())
        })?;
        Ok(QueryResult { columns, rows })
    }

    /// Runs `sql`, handing each row to `on_row` as soon as SQLite produces it.
    ///
    /// Returns the column names. When a source fails mid-scan the rows already
    /// handed out stay delivered and the error is returned.
    pub fn stream<F>(&self, sql: &str, mut on_row: F) -> Result<Vec<String>>
    where
        F: FnMut(&[String], Vec<Value>) -> Result<()>,
    {
        self.scope.reset();
        let mut stmt = self.conn.prepare(sql).map_err(|e| self.classify(e))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([]).map_err(|e| self.classify(e))?;
        let mut count = 0usize;
        while let Some(row) = rows.next().map_err(|e| self.classify(e))? {
            let values = (0..columns.len())
                .map(|i| row.get::<_, rusqlite::types::Value>(i).map(Value::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            on_row(&columns, values)?;
            count += 1;
        }
        tracing::debug!(rows = count, "query finished");
        Ok(columns)
    }

    fn classify(&self, err: rusqlite::Error) -> Error {
        if self.scope.is_cancelled() {
            Error::Cancelled
        } else {
            Error::Sql(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_holds_local_and_remote_tables() {
        let engine = Engine::new(Config::default()).unwrap();
        let names: Vec<&str> = engine.registry().names().collect();
        assert!(names.contains(&"commits"));
        assert!(names.contains(&"github_stargazers"));
        assert_eq!(names.len(), 19);
    }

    #[test]
    fn test_tables_split_arguments() {
        let engine = Engine::new(Config::default()).unwrap();
        let stargazers = engine
            .tables()
            .into_iter()
            .find(|t| t.name == "github_stargazers")
            .unwrap();
        assert_eq!(stargazers.arguments, vec!["owner", "reponame"]);
        assert!(stargazers.columns.contains(&"login".to_string()));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            github_per_page: 0,
            ..Config::default()
        };
        assert!(matches!(Engine::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_plain_sql_without_tables() {
        let engine = Engine::new(Config::default()).unwrap();
        let result = engine.query("SELECT 1 AS one, 'a' AS letter").unwrap();
        assert_eq!(result.columns, vec!["one", "letter"]);
        assert_eq!(result.rows, vec![vec![Value::Integer(1), Value::from("a")]]);
    }
}
