//! Engine tests joining local repositories with a scripted GitHub client.

use async_trait::async_trait;
use devsql::{Config, Engine, Error};
use devsql_vtab::Value;
use ghql::{GhqlError, GraphqlClient};
use parking_lot::Mutex;
use serde_json::{json, Value as Json};
use std::collections::VecDeque;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

struct ScriptedClient {
    responses: Mutex<VecDeque<Json>>,
    calls: Mutex<usize>,
}

impl ScriptedClient {
    fn new(responses: Vec<Json>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl GraphqlClient for ScriptedClient {
    async fn query(&self, _document: &str, _variables: &Json) -> ghql::Result<Json> {
        *self.calls.lock() += 1;
        self.responses.lock().pop_front().ok_or_else(|| GhqlError::Status {
            status: 502,
            body: "bad gateway".into(),
        })
    }
}

fn git(path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(path)
        .env("GIT_AUTHOR_NAME", "Test User")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test User")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_AUTHOR_DATE", "2024-01-01T12:00:00+0000")
        .env("GIT_COMMITTER_DATE", "2024-01-01T12:00:00+0000")
        .output()
        .expect("Failed to run git");
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Repository with two commits; returns their hashes oldest first.
fn test_repo() -> (TempDir, Vec<String>) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path();
    git(path, &["init", "-q"]);
    let mut hashes = Vec::new();
    for (file, message) in [("a.txt", "add a"), ("b.txt", "add b")] {
        std::fs::write(path.join(file), "x\n").expect("Failed to write file");
        git(path, &["add", "-A"]);
        git(path, &["commit", "-q", "-m", message]);
        hashes.push(git(path, &["rev-parse", "HEAD"]));
    }
    (temp, hashes)
}

fn commits_page(hashes: &[&str], end_cursor: &str, has_next_page: bool) -> Json {
    let edges: Vec<Json> = hashes
        .iter()
        .map(|h| {
            json!({ "node": { "commit": {
                "oid": h, "messageHeadline": "remote", "author": { "name": "Test User", "date": null, "user": null }
            } } })
        })
        .collect();
    json!({
        "data": { "repository": { "pullRequest": { "commits": {
            "edges": edges,
            "pageInfo": { "endCursor": end_cursor, "hasNextPage": has_next_page }
        } } } }
    })
}

fn engine(repo: &TempDir, client: Arc<ScriptedClient>) -> Engine {
    let config = Config {
        github_rate: 1000.0,
        github_burst: 10,
        ..Config::new(repo.path())
    };
    Engine::with_client(config, client).unwrap()
}

#[test]
fn test_local_query() {
    let (temp, hashes) = test_repo();
    let engine = engine(&temp, ScriptedClient::new(Vec::new()));

    let result = engine
        .query("SELECT hash, summary FROM commits ORDER BY committer_when, summary")
        .unwrap();
    assert_eq!(result.columns, vec!["hash", "summary"]);
    assert_eq!(
        result.column("hash"),
        hashes.iter().map(|h| Value::from(h.as_str())).collect::<Vec<_>>()
    );
}

#[test]
fn test_join_local_and_remote() {
    let (temp, hashes) = test_repo();
    let missing = "0000000000000000000000000000000000000001";
    let client = ScriptedClient::new(vec![
        commits_page(&[hashes[1].as_str()], "c1", false),
        commits_page(&[missing], "c1", false),
    ]);
    let engine = engine(&temp, client.clone());
    let sql = "SELECT c.summary FROM github_repo_pr_commits('octo/hello', 7) p \
               JOIN commits c ON c.hash = p.hash";

    let result = engine.query(sql).unwrap();
    assert_eq!(result.column("summary"), vec![Value::from("add b")]);
    assert_eq!(client.calls(), 1);

    let err = engine.query(sql).unwrap_err();
    assert!(err.to_string().contains("commit not found"), "{}", err);
}

#[test]
fn test_source_error_keeps_streamed_rows() {
    let (temp, _) = test_repo();
    let client = ScriptedClient::new(vec![commits_page(&["aaa", "bbb"], "c1", true)]);
    let engine = engine(&temp, client.clone());

    let mut seen = Vec::new();
    let err = engine
        .stream("SELECT hash FROM github_repo_pr_commits('octo/hello', 7)", |_, row| {
            seen.push(row);
            Ok(())
        })
        .unwrap_err();
    assert_eq!(
        seen,
        vec![vec![Value::from("aaa")], vec![Value::from("bbb")]]
    );
    assert!(err.to_string().contains("bad gateway"), "{}", err);
    assert!(!matches!(err, Error::Cancelled));
    assert_eq!(client.calls(), 2);
}

#[test]
fn test_cancel_stops_remote_query() {
    let (temp, _) = test_repo();
    let client = ScriptedClient::new(vec![
        commits_page(&["aaa", "bbb"], "c1", true),
        commits_page(&["ccc"], "c2", false),
    ]);
    let engine = engine(&temp, client.clone());
    let canceller = engine.canceller();

    let mut seen = 0;
    let err = engine
        .stream("SELECT hash FROM github_repo_pr_commits('octo/hello', 7)", |_, _| {
            seen += 1;
            canceller.cancel();
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled), "{}", err);
    assert!(seen >= 1);
    assert_eq!(client.calls(), 1);

    // the next query runs with a fresh scope
    let result = engine.query("SELECT count(*) AS n FROM commits").unwrap();
    assert_eq!(result.column("n"), vec![Value::Integer(2)]);
}

#[test]
fn test_planning_error_reaches_caller() {
    let (temp, _) = test_repo();
    let client = ScriptedClient::new(Vec::new());
    let engine = engine(&temp, client.clone());

    let err = engine.query("SELECT * FROM github_prs").unwrap_err();
    assert!(err.to_string().contains("missing required argument: owner"), "{}", err);
    assert_eq!(client.calls(), 0);
}

#[test]
fn test_remote_query_inside_async_runtime_fails() {
    let (temp, _) = test_repo();
    let client = ScriptedClient::new(Vec::new());
    let engine = engine(&temp, client.clone());
    let caller = tokio::runtime::Builder::new_current_thread().build().unwrap();

    let err = caller
        .block_on(async { engine.query("SELECT hash FROM github_repo_pr_commits('octo/hello', 7)") })
        .unwrap_err();
    assert!(err.to_string().contains("inside an async runtime"), "{}", err);
    assert_eq!(client.calls(), 0);

    // local tables never touch the runtime
    let result = caller
        .block_on(async { engine.query("SELECT count(*) AS n FROM commits") })
        .unwrap();
    assert_eq!(result.column("n"), vec![Value::Integer(2)]);
}
