//! Shared state of every remote table: runtime, client, limiter, scope.

use crate::client::{response_data, GraphqlClient};
use crate::error::{GhqlError, Result};
use devsql_vtab::{acquire_permit, CancellationToken, QueryScope, RateLimiter};
use serde_json::Value as Json;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};

/// Largest page size the API accepts.
pub const MAX_PER_PAGE: usize = 100;

/// Everything remote cursors share. Only the limiter carries mutable state.
pub struct GithubContext {
    runtime: Arc<Runtime>,
    client: Arc<dyn GraphqlClient>,
    limiter: Arc<dyn RateLimiter>,
    scope: QueryScope,
    per_page: usize,
}

impl GithubContext {
    pub fn new(
        runtime: Arc<Runtime>,
        client: Arc<dyn GraphqlClient>,
        limiter: Arc<dyn RateLimiter>,
        scope: QueryScope,
        per_page: usize,
    ) -> Self {
        Self {
            runtime,
            client,
            limiter,
            scope,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn scope(&self) -> &QueryScope {
        &self.scope
    }

    /// Token for one cursor scan; cancelling the query scope cancels it.
    pub fn token(&self) -> CancellationToken {
        self.scope.token()
    }

    /// Waits for a rate-limit permit, then runs one query and returns its
    /// `data`. Blocks the calling thread; both waits observe `cancel`.
    ///
    /// Fails with [`GhqlError::InsideRuntime`] when called from a thread that
    /// is already driving a tokio runtime.
    pub fn fetch(&self, document: &str, variables: &Json, cancel: &CancellationToken) -> Result<Json> {
        if Handle::try_current().is_ok() {
            return Err(GhqlError::InsideRuntime);
        }
        self.runtime.block_on(async {
            acquire_permit(self.limiter.as_ref(), cancel)
                .await
                .map_err(|_| GhqlError::Cancelled("rate limit wait canceled".into()))?;

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(GhqlError::Cancelled("request canceled".into()));
                }
                response = self.client.query(document, variables) => response?,
            };
            response_data(response)
        })
    }
}
