//! Definitions of every GitHub table.

mod audit;
mod issues;
mod pulls;
mod refs;
mod repos;

pub use audit::org_audit_log;
pub use issues::{issue_comments, issues};
pub use pulls::{pr_comments, pr_commits, pr_reviews, prs};
pub use refs::{repo_branches, repo_check_suites};
pub use repos::{org_repos, starred_repos, stargazers, user_repos};

use crate::table::TableSpec;

pub fn all() -> Vec<TableSpec> {
    vec![
        stargazers(),
        starred_repos(),
        org_repos(),
        user_repos(),
        issues(),
        prs(),
        pr_reviews(),
        pr_comments(),
        issue_comments(),
        pr_commits(),
        repo_branches(),
        repo_check_suites(),
        org_audit_log(),
    ]
}
