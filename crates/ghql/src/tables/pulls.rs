//! Pull requests, their reviews, comments and commits.

use super::issues::comment_columns;
use crate::identity::{ItemKind, Scope};
use crate::table::{RemoteColumn, TableSpec};

pub fn prs() -> TableSpec {
    TableSpec {
        name: "github_prs",
        scope: Scope::Repository,
        document: r#"query($owner: String!, $name: String!, $perPage: Int!, $cursor: String, $orderBy: IssueOrder) {
  repository(owner: $owner, name: $name) {
    pullRequests(first: $perPage, after: $cursor, orderBy: $orderBy) {
      edges {
        node {
          number title body state url isDraft locked closed merged mergeable
          baseRefName headRefName headRefOid
          additions deletions changedFiles
          createdAt updatedAt closedAt mergedAt
          author { login }
          mergedBy { login }
          commits { totalCount }
          comments { totalCount }
          labels(first: 20) { nodes { name } }
        }
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}"#,
        connection: &[("repository", "repository"), ("pullRequests", "pull requests")],
        columns: vec![
            RemoteColumn::integer("number", "/node/number"),
            RemoteColumn::text("title", "/node/title"),
            RemoteColumn::text("body", "/node/body"),
            RemoteColumn::text("state", "/node/state"),
            RemoteColumn::text("url", "/node/url"),
            RemoteColumn::text("author_login", "/node/author/login"),
            RemoteColumn::boolean("is_draft", "/node/isDraft"),
            RemoteColumn::boolean("locked", "/node/locked"),
            RemoteColumn::boolean("closed", "/node/closed"),
            RemoteColumn::boolean("merged", "/node/merged"),
            RemoteColumn::text("mergeable", "/node/mergeable"),
            RemoteColumn::text("merged_by", "/node/mergedBy/login"),
            RemoteColumn::text("base_ref_name", "/node/baseRefName"),
            RemoteColumn::text("head_ref_name", "/node/headRefName"),
            RemoteColumn::text("head_ref_oid", "/node/headRefOid"),
            RemoteColumn::integer("additions", "/node/additions"),
            RemoteColumn::integer("deletions", "/node/deletions"),
            RemoteColumn::integer("changed_files", "/node/changedFiles"),
            RemoteColumn::integer("commit_count", "/node/commits/totalCount"),
            RemoteColumn::integer("comment_count", "/node/comments/totalCount"),
            RemoteColumn::timestamp("created_at", "/node/createdAt").order("CREATED_AT"),
            RemoteColumn::timestamp("updated_at", "/node/updatedAt").order("UPDATED_AT"),
            RemoteColumn::timestamp("closed_at", "/node/closedAt"),
            RemoteColumn::timestamp("merged_at", "/node/mergedAt"),
            RemoteColumn::list("labels", "/node/labels/nodes", "/name"),
        ],
    }
}

pub fn pr_reviews() -> TableSpec {
    TableSpec {
        name: "github_pr_reviews",
        scope: Scope::Item(ItemKind::PullRequest),
        document: r#"query($owner: String!, $name: String!, $number: Int!, $perPage: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      reviews(first: $perPage, after: $cursor) {
        edges {
          node {
            id state body url authorAssociation createdAt submittedAt
            author { login }
            comments { totalCount }
          }
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}"#,
        connection: &[
            ("repository", "repository"),
            ("pullRequest", "pull request"),
            ("reviews", "reviews"),
        ],
        columns: vec![
            RemoteColumn::text("id", "/node/id"),
            RemoteColumn::text("author_login", "/node/author/login"),
            RemoteColumn::text("author_association", "/node/authorAssociation"),
            RemoteColumn::text("state", "/node/state"),
            RemoteColumn::text("body", "/node/body"),
            RemoteColumn::text("url", "/node/url"),
            RemoteColumn::integer("comment_count", "/node/comments/totalCount"),
            RemoteColumn::timestamp("created_at", "/node/createdAt"),
            RemoteColumn::timestamp("submitted_at", "/node/submittedAt"),
        ],
    }
}

pub fn pr_comments() -> TableSpec {
    TableSpec {
        name: "github_pr_comments",
        scope: Scope::Item(ItemKind::PullRequest),
        document: r#"query($owner: String!, $name: String!, $number: Int!, $perPage: Int!, $cursor: String, $orderBy: IssueCommentOrder) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      comments(first: $perPage, after: $cursor, orderBy: $orderBy) {
        edges { node { id author { login } authorAssociation body url createdAt updatedAt } }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}"#,
        connection: &[
            ("repository", "repository"),
            ("pullRequest", "pull request"),
            ("comments", "comments"),
        ],
        columns: comment_columns(),
    }
}

pub fn pr_commits() -> TableSpec {
    TableSpec {
        name: "github_repo_pr_commits",
        scope: Scope::Item(ItemKind::PullRequest),
        document: r#"query($owner: String!, $name: String!, $number: Int!, $perPage: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      commits(first: $perPage, after: $cursor) {
        edges {
          node {
            commit {
              oid message messageHeadline url additions deletions
              author { name email date user { login } }
              committer { name email date }
            }
          }
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}"#,
        connection: &[
            ("repository", "repository"),
            ("pullRequest", "pull request"),
            ("commits", "commits"),
        ],
        columns: vec![
            RemoteColumn::text("hash", "/node/commit/oid"),
            RemoteColumn::text("message", "/node/commit/message"),
            RemoteColumn::text("summary", "/node/commit/messageHeadline"),
            RemoteColumn::text("author_name", "/node/commit/author/name"),
            RemoteColumn::text("author_email", "/node/commit/author/email"),
            RemoteColumn::timestamp("author_when", "/node/commit/author/date"),
            RemoteColumn::text("author_login", "/node/commit/author/user/login"),
            RemoteColumn::text("committer_name", "/node/commit/committer/name"),
            RemoteColumn::text("committer_email", "/node/commit/committer/email"),
            RemoteColumn::timestamp("committer_when", "/node/commit/committer/date"),
            RemoteColumn::integer("additions", "/node/commit/additions"),
            RemoteColumn::integer("deletions", "/node/commit/deletions"),
            RemoteColumn::text("url", "/node/commit/url"),
        ],
    }
}
