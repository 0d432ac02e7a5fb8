//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Task group (task_group.rs):
//!     One task per listener + one signal watcher → join all → first error
//!
//! Shutdown (shutdown.rs):
//!     First trigger → fire once → stop every listener → drain within grace
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown → Interrupted
//!     Shutdown started elsewhere → exit cleanly
//! ```
//!
//! # Design Decisions
//! - Any listener returning, for any reason, stops its siblings
//! - The shutdown signal fires at most once and is never reset
//! - Each listener has its own grace period; a stuck one never blocks the rest

pub mod shutdown;
pub mod signals;
pub mod task_group;

use std::future::Future;

use crate::error::Error;
use crate::net::ListenerError;

pub use shutdown::{
    ListenerControl, ListenerHandle, ShutdownCoordinator, ShutdownError, DEFAULT_GRACE_PERIOD,
};
pub use signals::{ShutdownSignal, SignalWatcher};
pub use task_group::TaskGroup;

/// Drive one listener to completion and propagate its exit to the group.
///
/// Whatever way `serve` ends, the coordinator is triggered so sibling
/// listeners and the signal watcher stop too.
pub async fn run_listener<F>(
    name: String,
    coordinator: ShutdownCoordinator,
    serve: F,
) -> Result<(), Error>
where
    F: Future<Output = Result<(), ListenerError>>,
{
    tracing::info!(listener = %name, "Listener task started");
    let result = serve.await;

    if let Err(e) = &result {
        tracing::error!(listener = %name, error = %e, "Listener failed");
    }
    coordinator.trigger_shutdown().await;

    tracing::info!(listener = %name, "Listener task exit");
    result.map_err(|source| Error::Listener {
        listener: name,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn failed_listener_stops_siblings() {
        let coordinator = ShutdownCoordinator::default();
        let (sibling, control) = ListenerHandle::new("health");
        coordinator.register(sibling.clone());
        tokio::spawn(async move { control.stop_requested().await });

        let result = run_listener("api".into(), coordinator.clone(), async {
            Err(ListenerError::Accept(io::Error::other("socket closed")))
        })
        .await;

        assert!(matches!(result, Err(Error::Listener { ref listener, .. }) if listener == "api"));
        assert!(coordinator.is_shutdown_requested());
        assert!(sibling.is_stopped());
    }

    #[tokio::test]
    async fn clean_exit_still_propagates() {
        let coordinator = ShutdownCoordinator::default();

        run_listener("api".into(), coordinator.clone(), async { Ok(()) })
            .await
            .unwrap();

        assert!(coordinator.is_shutdown_requested());
    }
}
