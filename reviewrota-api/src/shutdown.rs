/// Graceful shutdown coordination
///
/// Shutdown uses two tokens:
/// - the signal token fires on Ctrl-C or SIGTERM. The server stops
///   accepting connections while in-flight requests keep running.
/// - the storage token is shared with every `CallGuard`. It fires only when
///   the drain window elapses, so leftover requests fail fast with
///   `CANCELLED` instead of holding the process open.
///
/// # Example
///
/// ```no_run
/// use reviewrota_api::shutdown::Shutdown;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(app: axum::Router) -> std::io::Result<()> {
/// let storage = CancellationToken::new();
/// let shutdown = Shutdown::new(storage.clone(), Duration::from_secs(30));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// let server = axum::serve(listener, app).with_graceful_shutdown(shutdown.signalled());
///
/// let outcome = shutdown.run(std::future::IntoFuture::into_future(server)).await?;
/// # Ok(())
/// # }
/// ```

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long requests get to observe storage cancellation before connections are dropped
pub const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// How the server stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every request finished within the drain window
    Completed,

    /// The drain window elapsed; storage was cancelled and the server then stopped
    Cancelled,

    /// The server was still busy after storage cancellation and was dropped
    Abandoned,
}

#[derive(Debug, Clone)]
pub struct Shutdown {
    signal: CancellationToken,
    storage: CancellationToken,
    drain_timeout: Duration,
}

impl Shutdown {
    pub fn new(storage: CancellationToken, drain_timeout: Duration) -> Self {
        Self {
            signal: CancellationToken::new(),
            storage,
            drain_timeout,
        }
    }

    /// Stops accepting new connections and starts the drain window
    pub fn trigger(&self) {
        if !self.signal.is_cancelled() {
            info!(
                drain_timeout_secs = self.drain_timeout.as_secs(),
                "Shutdown requested, draining requests"
            );
        }
        self.signal.cancel();
    }

    /// Resolves once shutdown was triggered; hand this to `with_graceful_shutdown`
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let signal = self.signal.clone();
        async move { signal.cancelled().await }
    }

    /// Drives `server` to completion, enforcing the drain window
    ///
    /// Storage stays usable until the window elapses after `trigger`.
    pub async fn run<F>(&self, server: F) -> io::Result<DrainOutcome>
    where
        F: Future<Output = io::Result<()>>,
    {
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => return result.map(|()| DrainOutcome::Completed),
            _ = self.drain_deadline() => {}
        }

        warn!(
            timeout_secs = self.drain_timeout.as_secs(),
            "Drain window elapsed, cancelling in-flight storage calls"
        );
        self.storage.cancel();

        match tokio::time::timeout(CANCEL_GRACE, &mut server).await {
            Ok(result) => result.map(|()| DrainOutcome::Cancelled),
            Err(_) => {
                warn!("Server still busy after cancellation, dropping remaining connections");
                Ok(DrainOutcome::Abandoned)
            }
        }
    }

    async fn drain_deadline(&self) {
        self.signal.cancelled().await;
        tokio::time::sleep(self.drain_timeout).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn shutdown(drain_secs: u64) -> (Shutdown, CancellationToken) {
        let storage = CancellationToken::new();
        (Shutdown::new(storage.clone(), Duration::from_secs(drain_secs)), storage)
    }

    #[tokio::test]
    async fn test_server_finishing_on_its_own() {
        let (shutdown, storage) = shutdown(30);

        let outcome = shutdown.run(async { Ok(()) }).await.unwrap();
        assert_eq!(outcome, DrainOutcome::Completed);
        assert!(!storage.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_open_during_drain_window() {
        let (shutdown, storage) = shutdown(30);
        shutdown.trigger();

        let outcome = shutdown
            .run(async {
                // slow request still running after the signal
                tokio::time::sleep(Duration::from_secs(10)).await;
                assert!(!storage.is_cancelled());
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, DrainOutcome::Completed);
        assert!(!storage.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_cancelled_after_drain_window() {
        let (shutdown, storage) = shutdown(30);
        let started = Instant::now();
        shutdown.trigger();

        let watched = storage.clone();
        let outcome = shutdown
            .run(async move {
                watched.cancelled().await;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, DrainOutcome::Cancelled);
        assert!(storage.is_cancelled());
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_server_is_abandoned() {
        let (shutdown, storage) = shutdown(10);
        shutdown.trigger();

        let outcome = shutdown
            .run(std::future::pending::<io::Result<()>>())
            .await
            .unwrap();

        assert_eq!(outcome, DrainOutcome::Abandoned);
        assert!(storage.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_deadline_without_trigger() {
        let (shutdown, storage) = shutdown(1);

        let outcome = shutdown
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, DrainOutcome::Completed);
        assert!(!storage.is_cancelled());
    }
}
