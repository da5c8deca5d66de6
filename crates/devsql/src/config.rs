use crate::error::Error;
use crate::Result;
use std::path::PathBuf;

/// Engine settings, read from command-line flags with environment fallbacks.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
    /// Git repository used when a query names none
    #[arg(short = 'r', long = "repo", env = "DEVSQL_REPO", default_value = ".", global = true)]
    pub repo: PathBuf,

    /// GitHub token for the github_* tables
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub github_token: Option<String>,

    /// GitHub requests per second
    #[arg(long, env = "GITHUB_RATE_LIMIT", default_value_t = 1.0, global = true)]
    pub github_rate: f64,

    /// Requests allowed back to back before throttling starts
    #[arg(long, env = "GITHUB_RATE_BURST", default_value_t = 1, global = true)]
    pub github_burst: usize,

    /// Items requested per GitHub page (1-100)
    #[arg(long, env = "GITHUB_PER_PAGE", default_value_t = 100, global = true)]
    pub github_per_page: usize,

    /// GitHub GraphQL endpoint
    #[arg(long, env = "GITHUB_GRAPHQL_URL", default_value = ghql::DEFAULT_ENDPOINT, global = true)]
    pub github_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo: PathBuf::from("."),
            github_token: None,
            github_rate: 1.0,
            github_burst: 1,
            github_per_page: 100,
            github_endpoint: ghql::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.github_rate.is_finite() || self.github_rate <= 0.0 {
            return Err(Error::Config(format!(
                "GitHub rate must be a positive number of requests per second, got {}",
                self.github_rate
            )));
        }
        if self.github_burst == 0 {
            return Err(Error::Config("GitHub burst must be at least 1".into()));
        }
        if !(1..=ghql::context::MAX_PER_PAGE).contains(&self.github_per_page) {
            return Err(Error::Config(format!(
                "GitHub page size must be between 1 and {}, got {}",
                ghql::context::MAX_PER_PAGE,
                self.github_per_page
            )));
        }
        Ok(())
    }
}
