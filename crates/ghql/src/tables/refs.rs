//! Branches and check suites.

use crate::identity::Scope;
use crate::table::{RemoteColumn, TableSpec};

pub fn repo_branches() -> TableSpec {
    TableSpec {
        name: "github_repo_branches",
        scope: Scope::Repository,
        document: r#"query($owner: String!, $name: String!, $perPage: Int!, $cursor: String, $orderBy: RefOrder) {
  repository(owner: $owner, name: $name) {
    refs(refPrefix: "refs/heads/", first: $perPage, after: $cursor, orderBy: $orderBy) {
      edges {
        node {
          name
          target {
            oid
            ... on Commit { committedDate messageHeadline author { name email } }
          }
          branchProtectionRule { pattern }
        }
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}"#,
        connection: &[("repository", "repository"), ("refs", "branches")],
        columns: vec![
            RemoteColumn::text("name", "/node/name").order("ALPHABETICAL"),
            RemoteColumn::text("hash", "/node/target/oid"),
            RemoteColumn::text("summary", "/node/target/messageHeadline"),
            RemoteColumn::text("author_name", "/node/target/author/name"),
            RemoteColumn::text("author_email", "/node/target/author/email"),
            RemoteColumn::timestamp("committed_at", "/node/target/committedDate"),
            RemoteColumn::text("protection_pattern", "/node/branchProtectionRule/pattern"),
        ],
    }
}

/// Check suites on the head commit of the default branch.
pub fn repo_check_suites() -> TableSpec {
    TableSpec {
        name: "github_repo_check_suites",
        scope: Scope::Repository,
        document: r#"query($owner: String!, $name: String!, $perPage: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    defaultBranchRef {
      target {
        ... on Commit {
          checkSuites(first: $perPage, after: $cursor) {
            edges {
              node {
                id status conclusion url createdAt updatedAt
                app { name slug }
                branch { name }
                commit { oid }
                checkRuns { totalCount }
              }
            }
            pageInfo { endCursor hasNextPage }
          }
        }
      }
    }
  }
}"#,
        connection: &[
            ("repository", "repository"),
            ("defaultBranchRef", "default branch"),
            ("target", "default branch head"),
            ("checkSuites", "check suites"),
        ],
        columns: vec![
            RemoteColumn::text("id", "/node/id"),
            RemoteColumn::text("app_name", "/node/app/name"),
            RemoteColumn::text("app_slug", "/node/app/slug"),
            RemoteColumn::text("status", "/node/status"),
            RemoteColumn::text("conclusion", "/node/conclusion"),
            RemoteColumn::text("branch", "/node/branch/name"),
            RemoteColumn::text("commit_hash", "/node/commit/oid"),
            RemoteColumn::integer("check_run_count", "/node/checkRuns/totalCount"),
            RemoteColumn::text("url", "/node/url"),
            RemoteColumn::timestamp("created_at", "/node/createdAt"),
            RemoteColumn::timestamp("updated_at", "/node/updatedAt"),
        ],
    }
}
