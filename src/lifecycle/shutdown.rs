//! Shutdown coordination across listeners.
//!
//! Each listener is split into two halves: a [`ListenerHandle`] that the
//! coordinator keeps and a [`ListenerControl`] owned by the serving side.
//! The coordinator fires a one-shot shutdown signal exactly once and asks
//! every registered listener to stop within the grace period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

/// Grace period applied to every listener when none is configured.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Error returned when a listener fails to stop cleanly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShutdownError {
    /// Connections were still open when the grace period ran out and had to
    /// be force-closed.
    #[error("{listener} listener did not stop within {grace:?}")]
    GracePeriodElapsed { listener: String, grace: Duration },
}

/// Coordinator-side half of a listener.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    name: Arc<str>,
    stop: CancellationToken,
    force: CancellationToken,
    stopped: CancellationToken,
}

/// Serving-side half of a listener.
///
/// Dropping it marks the listener as stopped, whether serving returned,
/// panicked or never started.
#[derive(Debug)]
pub struct ListenerControl {
    stop: CancellationToken,
    force: CancellationToken,
    _stopped: DropGuard,
}

impl ListenerHandle {
    /// Create a linked handle/control pair for the listener called `name`.
    pub fn new(name: impl Into<Arc<str>>) -> (ListenerHandle, ListenerControl) {
        let stop = CancellationToken::new();
        let force = CancellationToken::new();
        let stopped = CancellationToken::new();

        let control = ListenerControl {
            stop: stop.clone(),
            force: force.clone(),
            _stopped: stopped.clone().drop_guard(),
        };
        let handle = ListenerHandle {
            name: name.into(),
            stop,
            force,
            stopped,
        };
        (handle, control)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the listener to stop accepting without waiting for it.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Whether the serving side has finished.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Resolves once the serving side has finished.
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.stopped.cancelled()
    }

    /// Stop accepting, wait up to `grace` for in-flight connections, then
    /// force-close whatever is left.
    ///
    /// Calling this on a listener that already stopped returns `Ok(())`
    /// immediately.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), ShutdownError> {
        self.stop.cancel();

        if tokio::time::timeout(grace, self.stopped.cancelled())
            .await
            .is_ok()
        {
            return Ok(());
        }

        self.force.cancel();
        Err(ShutdownError::GracePeriodElapsed {
            listener: self.name.to_string(),
            grace,
        })
    }
}

impl ListenerControl {
    /// Resolves once a stop has been requested.
    pub fn stop_requested(&self) -> WaitForCancellationFuture<'_> {
        self.stop.cancelled()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Resolves once the grace period has run out.
    pub fn force_requested(&self) -> WaitForCancellationFuture<'_> {
        self.force.cancelled()
    }

    pub fn is_force_requested(&self) -> bool {
        self.force.is_cancelled()
    }

    /// Token cancelled together with the stop request, for handing to
    /// per-connection tasks.
    pub fn drain_token(&self) -> CancellationToken {
        self.stop.clone()
    }
}

/// Coordinator for graceful shutdown.
///
/// Cheap to clone; all clones share one shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    grace_period: Duration,
    fired: AtomicBool,
    requested: CancellationToken,
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl ShutdownCoordinator {
    /// Create a coordinator applying `grace_period` to each listener.
    pub fn new(grace_period: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                grace_period,
                fired: AtomicBool::new(false),
                requested: CancellationToken::new(),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.inner.grace_period
    }

    /// Add a listener to the shutdown fan-out.
    ///
    /// A listener registered after shutdown began is told to stop at once.
    pub fn register(&self, handle: ListenerHandle) {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .expect("listener registry mutex poisoned");

        if self.is_shutdown_requested() {
            tracing::warn!(listener = %handle.name(), "Listener registered after shutdown began");
            handle.request_stop();
        }
        listeners.push(handle);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .expect("listener registry mutex poisoned")
            .len()
    }

    /// Begin coordinated shutdown.
    ///
    /// Only the first caller fires the signal; it then shuts down every
    /// registered listener concurrently and returns `true` once each of them
    /// has stopped or used up its grace period. Every other caller returns
    /// `false` immediately.
    pub async fn trigger_shutdown(&self) -> bool {
        if self
            .inner
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Shutdown already in progress");
            return false;
        }
        self.inner.requested.cancel();

        let listeners = self
            .inner
            .listeners
            .lock()
            .expect("listener registry mutex poisoned")
            .clone();
        let grace = self.inner.grace_period;

        tracing::info!(
            listeners = listeners.len(),
            grace_period = ?grace,
            "Shutting down listeners"
        );

        join_all(listeners.iter().map(|listener| async move {
            match listener.shutdown(grace).await {
                Ok(()) => tracing::info!(listener = %listener.name(), "Listener stopped"),
                Err(e) => tracing::warn!(
                    listener = %listener.name(),
                    error = %e,
                    "Failed to shut down listener gracefully"
                ),
            }
        }))
        .await;

        true
    }

    /// Resolves once shutdown has begun, from any path.
    pub fn shutdown_requested(&self) -> WaitForCancellationFuture<'_> {
        self.inner.requested.cancelled()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.inner.requested.is_cancelled()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}
