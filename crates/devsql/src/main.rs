//! DevSQL CLI - SQL over Git repositories and GitHub

use clap::{CommandFactory, Parser, Subcommand};
use devsql::output::{OutputFormat, OutputWriter};
use devsql::{Canceller, Config, Engine};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

const LONG_ABOUT: &str = r#"Query Git repositories and GitHub with SQL.

Every table is a table-valued function. Arguments go in the call or in the
WHERE clause, and rows are fetched lazily while the query runs.

  devsql "SELECT hash, summary FROM commits LIMIT 5"
  devsql "SELECT login FROM github_stargazers('rust-lang/rust') LIMIT 10"

  devsql tables            # Show tables and their arguments
  devsql -f json "..."     # Output as JSON"#;

const AFTER_LONG_HELP: &str = r#"
LOCAL TABLES (optional first argument: repository path)

  commits, stats(rev), blame(rev), files(rev), tags, branches

GITHUB TABLES (need GITHUB_TOKEN)

  github_stargazers('owner/name')          github_issues('owner/name')
  github_prs('owner/name')                 github_repo_branches('owner/name')
  github_repo_check_suites('owner/name')   github_starred_repos('login')
  github_org_repos('org')                  github_user_repos('login')
  github_org_audit_log('org')              github_pr_reviews('owner/name', 1)
  github_pr_comments('owner/name', 1)      github_issue_comments('owner/name', 1)
  github_repo_pr_commits('owner', 'name', 1)

EXAMPLES

  devsql "SELECT author_email, COUNT(*) AS n FROM commits GROUP BY 1 ORDER BY n DESC"
  devsql "SELECT file_path, SUM(additions) FROM stats GROUP BY 1 ORDER BY 2 DESC LIMIT 10"
  devsql "SELECT name, stargazer_count FROM github_org_repos('rust-lang')
          ORDER BY pushed_at DESC LIMIT 5"
  devsql "SELECT c.hash, c.summary FROM commits c
          JOIN github_repo_pr_commits('owner', 'name', 42) p ON p.hash = c.hash"

OUTPUT FORMATS: -f table | json | jsonl | csv"#;

#[derive(Parser)]
#[command(name = "devsql")]
#[command(version)]
#[command(about = "Query Git repositories and GitHub with SQL", long_about = LONG_ABOUT)]
#[command(after_long_help = AFTER_LONG_HELP)]
struct Cli {
    /// SQL query to execute
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    #[command(flatten)]
    config: Config,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Omit header row
    #[arg(short = 'H', long = "no-header", global = true)]
    no_header: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show available tables, their arguments and columns
    Tables,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("devsql=debug,vcsql=debug,ghql=debug,devsql_vtab=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// First Ctrl-C cancels the running query; a second one exits.
fn cancel_on_interrupt(runtime: &Arc<Runtime>, canceller: Canceller) {
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::debug!("interrupt received, canceling query");
        canceller.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = Engine::new(cli.config)?;
    let stdout = std::io::stdout();
    let mut out = OutputWriter::new(stdout.lock(), cli.format, !cli.no_header);

    if let Some(Commands::Tables) = cli.command {
        out.tables(&engine.tables())?;
        return Ok(());
    }

    let Some(query) = cli.query else {
        Cli::command().print_long_help()?;
        return Ok(());
    };

    cancel_on_interrupt(engine.runtime(), engine.canceller());
    let mut columns = Vec::new();
    let result = engine.stream(&query, |names, row| {
        if columns.is_empty() {
            columns = names.to_vec();
        }
        out.row(names, row)
    });
    // rows produced before a failure are still printed
    match result {
        Ok(names) => out.finish(&names)?,
        Err(err) => {
            if !columns.is_empty() {
                out.finish(&columns)?;
            }
            return Err(err.into());
        }
    }
    Ok(())
}
