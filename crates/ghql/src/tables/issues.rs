//! Issues and issue comments.

use crate::identity::{ItemKind, Scope};
use crate::table::{RemoteColumn, TableSpec};

pub fn issues() -> TableSpec {
    TableSpec {
        name: "github_issues",
        scope: Scope::Repository,
        document: r#"query($owner: String!, $name: String!, $perPage: Int!, $cursor: String, $orderBy: IssueOrder) {
  repository(owner: $owner, name: $name) {
    issues(first: $perPage, after: $cursor, orderBy: $orderBy) {
      edges {
        node {
          number title body state stateReason url locked closed
          createdAt updatedAt closedAt
          author { login }
          milestone { title }
          comments { totalCount }
          labels(first: 20) { nodes { name } }
          assignees(first: 20) { nodes { login } }
        }
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}"#,
        connection: &[("repository", "repository"), ("issues", "issues")],
        columns: vec![
            RemoteColumn::integer("number", "/node/number"),
            RemoteColumn::text("title", "/node/title"),
            RemoteColumn::text("body", "/node/body"),
            RemoteColumn::text("state", "/node/state"),
            RemoteColumn::text("state_reason", "/node/stateReason"),
            RemoteColumn::text("url", "/node/url"),
            RemoteColumn::text("author_login", "/node/author/login"),
            RemoteColumn::boolean("locked", "/node/locked"),
            RemoteColumn::boolean("closed", "/node/closed"),
            RemoteColumn::timestamp("created_at", "/node/createdAt").order("CREATED_AT"),
            RemoteColumn::timestamp("updated_at", "/node/updatedAt").order("UPDATED_AT"),
            RemoteColumn::timestamp("closed_at", "/node/closedAt"),
            RemoteColumn::integer("comment_count", "/node/comments/totalCount").order("COMMENTS"),
            RemoteColumn::text("milestone", "/node/milestone/title"),
            RemoteColumn::list("labels", "/node/labels/nodes", "/name"),
            RemoteColumn::list("assignees", "/node/assignees/nodes", "/login"),
        ],
    }
}

/// Columns shared by issue and pull request comments.
pub(crate) fn comment_columns() -> Vec<RemoteColumn> {
    vec![
        RemoteColumn::text("id", "/node/id"),
        RemoteColumn::text("author_login", "/node/author/login"),
        RemoteColumn::text("author_association", "/node/authorAssociation"),
        RemoteColumn::text("body", "/node/body"),
        RemoteColumn::text("url", "/node/url"),
        RemoteColumn::timestamp("created_at", "/node/createdAt"),
        RemoteColumn::timestamp("updated_at", "/node/updatedAt").order("UPDATED_AT"),
    ]
}

pub fn issue_comments() -> TableSpec {
    TableSpec {
        name: "github_issue_comments",
        scope: Scope::Item(ItemKind::Issue),
        document: r#"query($owner: String!, $name: String!, $number: Int!, $perPage: Int!, $cursor: String, $orderBy: IssueCommentOrder) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      comments(first: $perPage, after: $cursor, orderBy: $orderBy) {
        edges { node { id author { login } authorAssociation body url createdAt updatedAt } }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}"#,
        connection: &[
            ("repository", "repository"),
            ("issue", "issue"),
            ("comments", "comments"),
        ],
        columns: comment_columns(),
    }
}
