//! Organization audit log.

use crate::identity::Scope;
use crate::table::{RemoteColumn, TableSpec};

pub fn org_audit_log() -> TableSpec {
    TableSpec {
        name: "github_org_audit_log",
        scope: Scope::Login,
        document: r#"query($login: String!, $perPage: Int!, $cursor: String, $orderBy: AuditLogOrder) {
  organization(login: $login) {
    auditLog(first: $perPage, after: $cursor, orderBy: $orderBy) {
      edges {
        node {
          __typename
          ... on Node { id }
          ... on AuditEntry {
            action actorLogin userLogin operationType createdAt
            actorLocation { countryCode city }
          }
        }
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}"#,
        connection: &[("organization", "organization"), ("auditLog", "audit log")],
        columns: vec![
            RemoteColumn::text("id", "/node/id"),
            RemoteColumn::text("entry_type", "/node/__typename"),
            RemoteColumn::text("action", "/node/action"),
            RemoteColumn::text("actor_login", "/node/actorLogin"),
            RemoteColumn::text("user_login", "/node/userLogin"),
            RemoteColumn::text("operation_type", "/node/operationType"),
            RemoteColumn::text("actor_country", "/node/actorLocation/countryCode"),
            RemoteColumn::text("actor_city", "/node/actorLocation/city"),
            RemoteColumn::timestamp("created_at", "/node/createdAt").order("CREATED_AT"),
        ],
    }
}
