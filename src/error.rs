//! Top-level error type.

use std::io;

use crate::config::ConfigError;
use crate::lifecycle::signals::ShutdownSignal;
use crate::net::ListenerError;

/// Errors surfaced by the tasks of a listener group.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A listener failed to start or stopped for a reason other than a
    /// requested shutdown.
    #[error("{listener} listener failed: {source}")]
    Listener {
        listener: String,
        #[source]
        source: ListenerError,
    },

    /// Shutdown was initiated by an operator signal.
    #[error("caught interrupt signal {0}")]
    Interrupted(ShutdownSignal),

    #[error("failed to install signal handlers: {0}")]
    SignalHandler(#[source] io::Error),

    #[error("task {task} panicked")]
    TaskPanicked { task: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether this error only reports an operator-initiated stop.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted(_))
    }
}
