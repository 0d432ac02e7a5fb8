//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers (Ctrl-C off Unix)
//! - Turn the first signal into a coordinated shutdown
//! - Exit quietly when shutdown was started from elsewhere

use std::future::Future;

use crate::error::Error;
use crate::lifecycle::shutdown::ShutdownCoordinator;

/// Termination signals recognized by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Task that waits for a termination signal or for shutdown to begin.
#[derive(Debug)]
pub struct SignalWatcher {
    coordinator: ShutdownCoordinator,
    signals: imp::OsSignals,
}

impl SignalWatcher {
    /// Register the OS signal handlers.
    ///
    /// Handlers are in place when this returns, so a signal delivered
    /// before [`SignalWatcher::run`] is polled is still observed.
    pub fn install(coordinator: ShutdownCoordinator) -> Result<Self, Error> {
        let signals = imp::OsSignals::install().map_err(Error::SignalHandler)?;
        Ok(Self {
            coordinator,
            signals,
        })
    }

    /// Wait until either a signal arrives or shutdown is requested.
    pub async fn run(self) -> Result<(), Error> {
        let Self {
            coordinator,
            mut signals,
        } = self;
        watch(&coordinator, signals.recv()).await
    }
}

/// Wait on `signal` and on the coordinator's shutdown request.
///
/// A signal triggers shutdown of every listener and yields
/// [`Error::Interrupted`]. A shutdown started elsewhere yields `Ok(())`.
pub async fn watch<S>(coordinator: &ShutdownCoordinator, signal: S) -> Result<(), Error>
where
    S: Future<Output = ShutdownSignal>,
{
    tokio::select! {
        signal = signal => {
            tracing::info!(signal = %signal, "Received shutdown signal");
            coordinator.trigger_shutdown().await;
            tracing::info!("Signal watcher exit");
            Err(Error::Interrupted(signal))
        }
        _ = coordinator.shutdown_requested() => {
            tracing::info!("Signal watcher exit");
            Ok(())
        }
    }
}

#[cfg(unix)]
mod imp {
    use std::io;
    use tokio::signal::unix::{signal, Signal, SignalKind};

    use super::ShutdownSignal;

    #[derive(Debug)]
    pub(super) struct OsSignals {
        interrupt: Signal,
        terminate: Signal,
    }

    impl OsSignals {
        pub(super) fn install() -> io::Result<Self> {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        pub(super) async fn recv(&mut self) -> ShutdownSignal {
            tokio::select! {
                _ = self.interrupt.recv() => ShutdownSignal::Interrupt,
                _ = self.terminate.recv() => ShutdownSignal::Terminate,
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::io;

    use super::ShutdownSignal;

    #[derive(Debug)]
    pub(super) struct OsSignals;

    impl OsSignals {
        pub(super) fn install() -> io::Result<Self> {
            Ok(Self)
        }

        pub(super) async fn recv(&mut self) -> ShutdownSignal {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Ctrl-C handler failed");
                std::future::pending::<()>().await;
            }
            ShutdownSignal::Interrupt
        }
    }
}
