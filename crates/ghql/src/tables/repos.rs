//! Stars and repository listings.

use crate::identity::Scope;
use crate::table::{RemoteColumn, TableSpec};

macro_rules! repository_fields {
    () => {
        "nameWithOwner name description url homepageUrl isPrivate isFork isArchived \
         stargazerCount forkCount createdAt updatedAt pushedAt \
         primaryLanguage { name } licenseInfo { spdxId } defaultBranchRef { name } \
         repositoryTopics(first: 20) { nodes { topic { name } } }"
    };
}

/// Repository columns read from `{prefix}/...`; `orderable` maps the
/// columns `RepositoryOrder` can sort by.
fn repository_columns(prefix: &str, orderable: bool) -> Vec<RemoteColumn> {
    let at = |field: &str| format!("{}/{}", prefix, field);
    let order = |column: RemoteColumn, field: &'static str| {
        if orderable {
            column.order(field)
        } else {
            column
        }
    };
    vec![
        RemoteColumn::text("name_with_owner", at("nameWithOwner")),
        order(RemoteColumn::text("name", at("name")), "NAME"),
        RemoteColumn::text("description", at("description")),
        RemoteColumn::text("url", at("url")),
        RemoteColumn::text("homepage_url", at("homepageUrl")),
        RemoteColumn::boolean("is_private", at("isPrivate")),
        RemoteColumn::boolean("is_fork", at("isFork")),
        RemoteColumn::boolean("is_archived", at("isArchived")),
        order(
            RemoteColumn::integer("stargazer_count", at("stargazerCount")),
            "STARGAZERS",
        ),
        RemoteColumn::integer("fork_count", at("forkCount")),
        order(RemoteColumn::timestamp("created_at", at("createdAt")), "CREATED_AT"),
        order(RemoteColumn::timestamp("updated_at", at("updatedAt")), "UPDATED_AT"),
        order(RemoteColumn::timestamp("pushed_at", at("pushedAt")), "PUSHED_AT"),
        RemoteColumn::text("primary_language", at("primaryLanguage/name")),
        RemoteColumn::text("license", at("licenseInfo/spdxId")),
        RemoteColumn::text("default_branch", at("defaultBranchRef/name")),
        RemoteColumn::list("topics", at("repositoryTopics/nodes"), "/topic/name"),
    ]
}

pub fn stargazers() -> TableSpec {
    TableSpec {
        name: "github_stargazers",
        scope: Scope::Repository,
        document: r#"query($owner: String!, $name: String!, $perPage: Int!, $cursor: String, $orderBy: StarOrder) {
  repository(owner: $owner, name: $name) {
    stargazers(first: $perPage, after: $cursor, orderBy: $orderBy) {
      edges {
        starredAt
        node { login name email company location bio url createdAt twitterUsername }
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}"#,
        connection: &[("repository", "repository"), ("stargazers", "stargazers")],
        columns: vec![
            RemoteColumn::text("login", "/node/login"),
            RemoteColumn::text("name", "/node/name"),
            RemoteColumn::text("email", "/node/email"),
            RemoteColumn::text("company", "/node/company"),
            RemoteColumn::text("location", "/node/location"),
            RemoteColumn::text("bio", "/node/bio"),
            RemoteColumn::text("url", "/node/url"),
            RemoteColumn::text("twitter", "/node/twitterUsername"),
            RemoteColumn::timestamp("created_at", "/node/createdAt"),
            RemoteColumn::timestamp("starred_at", "/starredAt").order("STARRED_AT"),
        ],
    }
}

pub fn starred_repos() -> TableSpec {
    let mut columns = repository_columns("/node", false);
    columns.push(RemoteColumn::timestamp("starred_at", "/starredAt").order("STARRED_AT"));
    TableSpec {
        name: "github_starred_repos",
        scope: Scope::Login,
        document: concat!(
            "query($login: String!, $perPage: Int!, $cursor: String, $orderBy: StarOrder) {\n",
            "  user(login: $login) {\n",
            "    starredRepositories(first: $perPage, after: $cursor, orderBy: $orderBy) {\n",
            "      edges { starredAt node { ",
            repository_fields!(),
            " } }\n",
            "      pageInfo { endCursor hasNextPage }\n",
            "    }\n",
            "  }\n",
            "}"
        ),
        connection: &[("user", "user"), ("starredRepositories", "starred repositories")],
        columns,
    }
}

pub fn org_repos() -> TableSpec {
    TableSpec {
        name: "github_org_repos",
        scope: Scope::Login,
        document: concat!(
            "query($login: String!, $perPage: Int!, $cursor: String, $orderBy: RepositoryOrder) {\n",
            "  organization(login: $login) {\n",
            "    repositories(first: $perPage, after: $cursor, orderBy: $orderBy) {\n",
            "      edges { node { ",
            repository_fields!(),
            " } }\n",
            "      pageInfo { endCursor hasNextPage }\n",
            "    }\n",
            "  }\n",
            "}"
        ),
        connection: &[("organization", "organization"), ("repositories", "repositories")],
        columns: repository_columns("/node", true),
    }
}

pub fn user_repos() -> TableSpec {
    TableSpec {
        name: "github_user_repos",
        scope: Scope::Login,
        document: concat!(
            "query($login: String!, $perPage: Int!, $cursor: String, $orderBy: RepositoryOrder) {\n",
            "  user(login: $login) {\n",
            "    repositories(first: $perPage, after: $cursor, orderBy: $orderBy, ownerAffiliations: [OWNER]) {\n",
            "      edges { node { ",
            repository_fields!(),
            " } }\n",
            "      pageInfo { endCursor hasNextPage }\n",
            "    }\n",
            "  }\n",
            "}"
        ),
        connection: &[("user", "user"), ("repositories", "repositories")],
        columns: repository_columns("/node", true),
    }
}
