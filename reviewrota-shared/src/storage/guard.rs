/// Deadline and cancellation wrapper for storage round-trips
///
/// Storage calls are the only suspension points of the services. Each one
/// runs under a `CallGuard`, which:
///
/// 1. refuses to start a call once the cancellation token has fired
/// 2. aborts an in-flight call when the token fires
/// 3. aborts a call that exceeds the per-call timeout
///
/// # Example
///
/// ```no_run
/// use reviewrota_shared::storage::{CallGuard, InMemoryStore, UserStore};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryStore::new();
/// let guard = CallGuard::new(Duration::from_secs(5), CancellationToken::new());
///
/// let user = guard.run(store.get_by_id("u1")).await?;
/// # Ok(())
/// # }
/// ```

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{StoreError, StoreResult};

/// Default per-call timeout (5 seconds)
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounds storage calls with a timeout and a cancellation token
#[derive(Debug, Clone)]
pub struct CallGuard {
    timeout: Duration,
    cancel: CancellationToken,
}

impl CallGuard {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    /// Runs one storage call under the deadline and cancellation token
    pub async fn run<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
            result = tokio::time::timeout(self.timeout, call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(StoreError::TimedOut),
            },
        }
    }
}

impl Default for CallGuard {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT, CancellationToken::new())
    }
}
