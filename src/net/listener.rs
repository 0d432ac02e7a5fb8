//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Separate per-connection and resource-exhaustion accept failures from
//!   fatal ones

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// First pause after the process runs out of descriptors or buffers.
const ACCEPT_BACKOFF_START: Duration = Duration::from_millis(5);
/// Longest pause between accept retries.
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The accept loop failed and the transport is gone.
    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),
}

/// A bound TCP listener.
#[derive(Debug)]
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Address the socket is actually bound to.
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to the given address.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;

        Self::from_tcp(listener).map_err(|source| ListenerError::Bind { addr, source })
    }

    /// Wrap an already bound socket.
    pub fn from_tcp(inner: TcpListener) -> io::Result<Self> {
        let local_addr = inner.local_addr()?;
        tracing::info!(address = %local_addr, "Listener bound");
        Ok(Self { inner, local_addr })
    }

    /// Accept a new connection.
    ///
    /// Errors that only concern the peer being accepted are logged and the
    /// call keeps waiting. Running out of descriptors or memory is retried
    /// after a pause that doubles up to one second. Any other error is
    /// returned as fatal.
    ///
    /// Dropping the returned future cancels the pause.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let mut backoff = ACCEPT_BACKOFF_START;
        loop {
            match self.inner.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!(peer_addr = %peer, "Connection accepted");
                    return Ok((stream, peer));
                }
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "Dropped connection during accept");
                }
                Err(e) if is_resource_exhausted(&e) => {
                    tracing::warn!(
                        address = %self.local_addr,
                        error = %e,
                        retry_in = ?backoff,
                        "Accept failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(ACCEPT_BACKOFF_MAX);
                }
                Err(e) => return Err(ListenerError::Accept(e)),
            }
        }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// EMFILE, ENFILE, ENOBUFS and ENOMEM clear up once connections close.
fn is_resource_exhausted(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::OutOfMemory {
        return true;
    }
    #[cfg(unix)]
    {
        matches!(
            e.raw_os_error(),
            Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
        )
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_connection_errors_are_not_fatal() {
        assert!(is_connection_error(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_connection_error(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(!is_connection_error(&io::Error::from(io::ErrorKind::InvalidInput)));
    }

    #[cfg(unix)]
    #[test]
    fn descriptor_exhaustion_is_retried() {
        for code in [libc::EMFILE, libc::ENFILE, libc::ENOBUFS, libc::ENOMEM] {
            let e = io::Error::from_raw_os_error(code);
            assert!(is_resource_exhausted(&e), "{e} must be retried");
            assert!(!is_connection_error(&e));
        }
        assert!(!is_resource_exhausted(&io::Error::from_raw_os_error(libc::EINVAL)));
    }

    #[tokio::test]
    async fn bind_conflict_reports_address() {
        let first = Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let taken = first.local_addr();

        let err = Listener::bind(taken).await.unwrap_err();
        match err {
            ListenerError::Bind { addr, .. } => assert_eq!(addr, taken),
            other => panic!("unexpected error: {other}"),
        }
    }
}
