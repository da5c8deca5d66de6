//! Query-scoped cancellation.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// Holds the cancellation token of the query currently executing.
///
/// Cursors take a token when they are filtered; cancelling the scope makes
/// every pending rate-limit wait and remote call of that query return
/// [`crate::Error::Cancelled`]. [`QueryScope::reset`] arms a fresh token for
/// the next query.
#[derive(Debug, Clone, Default)]
pub struct QueryScope {
    current: Arc<RwLock<CancellationToken>>,
}

impl QueryScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for work started by the current query.
    pub fn token(&self) -> CancellationToken {
        self.current.read().child_token()
    }

    /// Cancels the current query. Callable from any thread.
    pub fn cancel(&self) {
        tracing::debug!("query canceled");
        self.current.read().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.current.read().is_cancelled()
    }

    /// Replaces a cancelled token so the next query can run.
    pub fn reset(&self) {
        let mut current = self.current.write();
        if current.is_cancelled() {
            *current = CancellationToken::new();
        }
    }
}
