//! Remote tables driven against a scripted GraphQL client.

use async_trait::async_trait;
use devsql_vtab::harness;
use devsql_vtab::{
    Args, Constraint, OrderBy, QueryScope, RateLimiter, Registry, TableModule, TokenBucket, Value,
};
use ghql::{tables, GhqlError, GithubContext, GraphqlClient, RemoteTable};
use parking_lot::Mutex;
use rusqlite::Connection;
use serde_json::{json, Value as Json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::time::Instant;

/// Replays canned response envelopes and records every request's variables.
struct ScriptedClient {
    responses: Mutex<VecDeque<Json>>,
    calls: Mutex<Vec<Json>>,
}

impl ScriptedClient {
    fn new(responses: Vec<Json>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Json> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl GraphqlClient for ScriptedClient {
    async fn query(&self, _document: &str, variables: &Json) -> ghql::Result<Json> {
        self.calls.lock().push(variables.clone());
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| GhqlError::Status {
                status: 500,
                body: "no scripted response left".into(),
            })
    }
}

/// Token bucket that records when each permit was granted.
struct RecordingLimiter {
    inner: TokenBucket,
    granted: Mutex<Vec<Instant>>,
}

#[async_trait]
impl RateLimiter for RecordingLimiter {
    async fn acquire(&self) {
        self.inner.acquire().await;
        self.granted.lock().push(Instant::now());
    }

    fn try_acquire(&self) -> bool {
        self.inner.try_acquire()
    }

    fn available(&self) -> usize {
        self.inner.available()
    }
}

struct Fixture {
    ctx: Arc<GithubContext>,
    client: Arc<ScriptedClient>,
    limiter: Arc<RecordingLimiter>,
    scope: QueryScope,
    _runtime: Arc<Runtime>,
}

fn fixture_with_rate(responses: Vec<Json>, per_page: usize, rate: f64) -> Fixture {
    let runtime = Arc::new(
        Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap(),
    );
    let limiter = {
        let _guard = runtime.enter();
        Arc::new(RecordingLimiter {
            inner: TokenBucket::new(rate, 1),
            granted: Mutex::new(Vec::new()),
        })
    };
    let client = Arc::new(ScriptedClient::new(responses));
    let scope = QueryScope::new();
    let ctx = Arc::new(GithubContext::new(
        Arc::clone(&runtime),
        client.clone(),
        limiter.clone(),
        scope.clone(),
        per_page,
    ));
    Fixture {
        ctx,
        client,
        limiter,
        scope,
        _runtime: runtime,
    }
}

fn fixture(responses: Vec<Json>) -> Fixture {
    fixture_with_rate(responses, 3, 1000.0)
}

fn stargazer_page(edges: &[(&str, &str)], end_cursor: Option<&str>, has_next_page: bool) -> Json {
    let edges: Vec<Json> = edges
        .iter()
        .map(|(login, at)| json!({ "starredAt": at, "node": { "login": login } }))
        .collect();
    json!({
        "data": {
            "repository": {
                "stargazers": {
                    "edges": edges,
                    "pageInfo": { "endCursor": end_cursor, "hasNextPage": has_next_page }
                }
            }
        }
    })
}

fn two_pages() -> Vec<Json> {
    vec![
        stargazer_page(
            &[
                ("ada", "2024-01-01T00:00:00Z"),
                ("bob", "2024-01-02T00:00:00Z"),
                ("cy", "2024-01-03T00:00:00Z"),
            ],
            Some("c1"),
            true,
        ),
        stargazer_page(
            &[("dee", "2024-01-04T00:00:00Z"), ("eve", "2024-01-05T00:00:00Z")],
            Some("c2"),
            false,
        ),
    ]
}

fn stargazers(ctx: &Arc<GithubContext>) -> RemoteTable {
    RemoteTable::new(tables::stargazers(), Arc::clone(ctx)).unwrap()
}

#[test]
fn test_stargazers_two_pages() {
    let fx = fixture(two_pages());
    let table = stargazers(&fx.ctx);
    let scan = harness::scan(&table, &[Constraint::eq(0, "octo/hello")], &[]).unwrap();

    assert_eq!(scan.strings("login"), vec!["ada", "bob", "cy", "dee", "eve"]);
    assert_eq!(
        scan.strings("starred_at"),
        vec![
            "2024-01-01T00:00:00Z",
            "2024-01-02T00:00:00Z",
            "2024-01-03T00:00:00Z",
            "2024-01-04T00:00:00Z",
            "2024-01-05T00:00:00Z",
        ]
    );
    assert_eq!(scan.strings("owner"), vec!["octo"; 5]);
    assert_eq!(scan.strings("reponame"), vec!["hello"; 5]);

    let calls = fx.client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["cursor"], Json::Null);
    assert_eq!(calls[1]["cursor"], "c1");
    assert_eq!(calls[0]["owner"], "octo");
    assert_eq!(calls[0]["name"], "hello");
    assert_eq!(calls[0]["perPage"], 3);
    assert_eq!(calls[0]["orderBy"], Json::Null);
}

#[test]
fn test_next_after_eof_issues_no_calls() {
    let fx = fixture(two_pages());
    let table = stargazers(&fx.ctx);
    let constraints = [Constraint::eq(0, "octo/hello")];
    let plan = table.plan(&constraints, &[]).unwrap();
    let args = Args::bind(&plan, harness::arguments(&plan, &constraints).unwrap()).unwrap();

    let mut cursor = table.open().unwrap();
    cursor.filter(&plan, &args).unwrap();
    let mut rows = 0;
    while !cursor.eof() {
        rows += 1;
        cursor.next().unwrap();
    }
    assert_eq!(rows, 5);

    for _ in 0..3 {
        cursor.next().unwrap();
        assert!(cursor.eof());
    }
    cursor.close();
    assert_eq!(fx.client.calls().len(), 2);
}

#[test]
fn test_native_order_is_sent_to_api() {
    let fx = fixture(two_pages());
    let table = stargazers(&fx.ctx);
    let starred_at = table.descriptor().index_of("starred_at").unwrap();

    let scan = harness::scan(
        &table,
        &[Constraint::eq(0, "octo/hello")],
        &[OrderBy::desc(starred_at)],
    )
    .unwrap();
    assert!(scan.plan.order_by_consumed);
    assert_eq!(scan.len(), 5);
    assert_eq!(
        fx.client.calls()[0]["orderBy"],
        json!({ "field": "STARRED_AT", "direction": "DESC" })
    );
}

#[test]
fn test_unmapped_order_is_left_to_engine() {
    let fx = fixture(two_pages());
    let table = stargazers(&fx.ctx);
    let login = table.descriptor().index_of("login").unwrap();

    let plan = table
        .plan(&[Constraint::eq(0, "octo/hello")], &[OrderBy::asc(login)])
        .unwrap();
    assert!(!plan.order_by_consumed);
    assert!(plan.native_order.is_none());
}

#[test]
fn test_identity_forms_give_same_plan_and_rows() {
    let joined = fixture(two_pages());
    let split = fixture(two_pages());
    let starred_at = stargazers(&joined.ctx)
        .descriptor()
        .index_of("starred_at")
        .unwrap();
    let order = [OrderBy::asc(starred_at)];

    let a = harness::scan(
        &stargazers(&joined.ctx),
        &[Constraint::eq(0, "octo/hello")],
        &order,
    )
    .unwrap();
    let b = harness::scan(
        &stargazers(&split.ctx),
        &[Constraint::eq(0, "octo"), Constraint::eq(1, "hello")],
        &order,
    )
    .unwrap();

    assert_eq!(a.plan.access_path, b.plan.access_path);
    assert_eq!(a.plan.access_name, b.plan.access_name);
    assert_eq!(a.plan.estimated_cost, b.plan.estimated_cost);
    assert_eq!(a.plan.native_order, b.plan.native_order);
    assert_eq!(a.rows, b.rows);
    assert_eq!(joined.client.calls(), split.client.calls());
}

#[test]
fn test_invalid_pull_request_number_fails_planning() {
    let fx = fixture(Vec::new());
    let table = RemoteTable::new(tables::pr_commits(), Arc::clone(&fx.ctx)).unwrap();

    let err = harness::scan(
        &table,
        &[
            Constraint::eq(0, "owner"),
            Constraint::eq(1, "repo"),
            Constraint::eq(2, 0i64),
        ],
        &[],
    )
    .unwrap_err();
    assert!(err.is_planning());
    assert!(err.to_string().contains("invalid pull request number"), "{}", err);
    assert!(fx.client.calls().is_empty());
}

#[test]
fn test_item_table_requires_number() {
    let fx = fixture(Vec::new());
    let table = RemoteTable::new(tables::pr_reviews(), Arc::clone(&fx.ctx)).unwrap();
    let err = table.plan(&[Constraint::eq(0, "owner")], &[]).unwrap_err();
    assert_eq!(err.to_string(), "missing required argument: number");
}

#[test]
fn test_item_table_short_form() {
    let page = json!({
        "data": { "repository": { "pullRequest": { "commits": {
            "edges": [{ "node": { "commit": {
                "oid": "abc123", "messageHeadline": "Fix it",
                "author": { "name": "Ada", "date": "2024-02-01T10:00:00+01:00", "user": null }
            } } }],
            "pageInfo": { "endCursor": "x", "hasNextPage": false }
        } } } }
    });
    let fx = fixture(vec![page]);
    let table = RemoteTable::new(tables::pr_commits(), Arc::clone(&fx.ctx)).unwrap();
    let scan = harness::scan(
        &table,
        &[Constraint::eq(0, "octo/hello"), Constraint::eq(1, 42i64)],
        &[],
    )
    .unwrap();

    assert_eq!(scan.strings("hash"), vec!["abc123"]);
    assert_eq!(scan.strings("summary"), vec!["Fix it"]);
    assert_eq!(scan.strings("author_when"), vec!["2024-02-01T10:00:00+01:00"]);
    assert_eq!(scan.column("author_login"), vec![Value::Null]);
    assert_eq!(scan.column("number"), vec![Value::Integer(42)]);
    assert_eq!(fx.client.calls()[0]["number"], 42);
}

#[test]
fn test_partial_data_is_a_source_error() {
    let fx = fixture(vec![json!({
        "data": { "repository": { "stargazers": {
            "edges": [{ "starredAt": "2024-01-01T00:00:00Z", "node": { "login": "ada" } }],
            "pageInfo": { "endCursor": "c1", "hasNextPage": false }
        } } },
        "errors": [{ "message": "Something went wrong while executing your query" }]
    })]);
    let table = stargazers(&fx.ctx);
    let err = harness::scan(&table, &[Constraint::eq(0, "octo/hello")], &[]).unwrap_err();
    assert!(!err.is_planning());
    assert!(!err.is_cancelled());
    assert!(err.to_string().contains("remote API returned partial data"), "{}", err);
}

#[test]
fn test_missing_repository_is_not_found() {
    let fx = fixture(vec![json!({ "data": { "repository": null } })]);
    let table = stargazers(&fx.ctx);
    let err = harness::scan(&table, &[Constraint::eq(0, "octo/nope")], &[]).unwrap_err();
    assert_eq!(err.to_string(), "github_stargazers: repository not found");
}

#[test]
fn test_rows_before_failure_are_kept() {
    let fx = fixture(vec![stargazer_page(
        &[("ada", "2024-01-01T00:00:00Z"), ("bob", "2024-01-02T00:00:00Z")],
        Some("c1"),
        true,
    )]);
    let table = stargazers(&fx.ctx);
    let constraints = [Constraint::eq(0, "octo/hello")];
    let plan = table.plan(&constraints, &[]).unwrap();
    let args = Args::bind(&plan, harness::arguments(&plan, &constraints).unwrap()).unwrap();

    let mut cursor = table.open().unwrap();
    cursor.filter(&plan, &args).unwrap();
    let login = table.descriptor().index_of("login").unwrap();
    assert_eq!(cursor.column(login).unwrap(), Value::from("ada"));
    cursor.next().unwrap();
    assert_eq!(cursor.column(login).unwrap(), Value::from("bob"));

    let err = cursor.next().unwrap_err();
    assert!(err.to_string().contains("no scripted response left"), "{}", err);
    assert!(cursor.eof());
    cursor.next().unwrap();
    assert_eq!(fx.client.calls().len(), 2);
}

#[test]
fn test_page_fetches_respect_rate() {
    let pages: Vec<Json> = (0..4)
        .map(|i| {
            let cursor = format!("c{}", i);
            stargazer_page(&[("ada", "2024-01-01T00:00:00Z")], Some(cursor.as_str()), i < 3)
        })
        .collect();
    let fx = fixture_with_rate(pages, 1, 2.0);
    let table = stargazers(&fx.ctx);
    let scan = harness::scan(&table, &[Constraint::eq(0, "octo/hello")], &[]).unwrap();
    assert_eq!(scan.len(), 4);

    let granted = fx.limiter.granted.lock().clone();
    assert_eq!(granted.len(), 4);
    for (k, at) in granted.iter().enumerate() {
        let elapsed = at.duration_since(granted[0]);
        assert!(
            elapsed >= Duration::from_millis(500 * k as u64),
            "permit {} granted after {:?}",
            k,
            elapsed
        );
    }
}

#[test]
fn test_cancelled_query_stops_before_fetch() {
    let fx = fixture(two_pages());
    fx.scope.cancel();
    let table = stargazers(&fx.ctx);

    let err = harness::scan(&table, &[Constraint::eq(0, "octo/hello")], &[]).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.to_string(), "canceled: rate limit wait canceled");
    assert!(fx.client.calls().is_empty());

    fx.scope.reset();
    let scan = harness::scan(&table, &[Constraint::eq(0, "octo/hello")], &[]).unwrap();
    assert_eq!(scan.len(), 5);
}

#[test]
fn test_scan_inside_async_runtime_is_refused() {
    let fx = fixture(two_pages());
    let table = stargazers(&fx.ctx);
    let caller = Builder::new_current_thread().build().unwrap();

    let err = caller
        .block_on(async { harness::scan(&table, &[Constraint::eq(0, "octo/hello")], &[]) })
        .unwrap_err();
    assert!(!err.is_cancelled());
    assert!(err.to_string().contains("inside an async runtime"), "{}", err);
    assert!(fx.client.calls().is_empty());
}

#[test]
fn test_every_table_builds() {
    let fx = fixture(Vec::new());
    let modules = ghql::modules(Arc::clone(&fx.ctx)).unwrap();
    let mut registry = Registry::new();
    registry.register_all(modules).unwrap();
    assert_eq!(registry.len(), 13);
    assert!(registry.get("github_org_audit_log").is_ok());
}

fn connection(fx: &Fixture) -> Connection {
    let mut registry = Registry::new();
    registry
        .register_all(ghql::modules(Arc::clone(&fx.ctx)).unwrap())
        .unwrap();
    let conn = Connection::open_in_memory().unwrap();
    registry.install(&conn).unwrap();
    conn
}

#[test]
fn test_sql_table_valued_call_and_where_form() {
    let mut responses = two_pages();
    responses.extend(two_pages());
    let fx = fixture(responses);
    let conn = connection(&fx);

    let query = |sql: &str| -> Vec<String> {
        let mut stmt = conn.prepare(sql).unwrap();
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        rows
    };

    let a = query("SELECT login FROM github_stargazers('octo/hello')");
    let b = query("SELECT login FROM github_stargazers WHERE owner = 'octo' AND reponame = 'hello'");
    assert_eq!(a, vec!["ada", "bob", "cy", "dee", "eve"]);
    assert_eq!(a, b);
}

#[test]
fn test_sql_invalid_number_produces_no_rows() {
    let fx = fixture(Vec::new());
    let conn = connection(&fx);
    let err = conn
        .query_row(
            "SELECT count(*) FROM github_repo_pr_commits('owner', 'repo', 0)",
            [],
            |row| row.get::<_, i64>(0),
        )
        .unwrap_err();
    assert!(err.to_string().contains("invalid pull request number"), "{}", err);
    assert!(fx.client.calls().is_empty());
}

#[test]
fn test_sql_missing_identity_fails_at_prepare() {
    let fx = fixture(Vec::new());
    let conn = connection(&fx);
    let err = conn.prepare("SELECT * FROM github_issues").unwrap_err();
    assert!(err.to_string().contains("missing required argument: owner"), "{}", err);
}
