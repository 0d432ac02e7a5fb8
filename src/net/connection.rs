//! Connection lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Serve one HTTP/1.1 or HTTP/2 connection per task
//! - Drain connections gracefully, or abort them once the grace period is spent

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The set of open connections owned by one listener.
///
/// Dropping the set aborts every connection still running.
#[derive(Debug, Default)]
pub struct Connections {
    tasks: JoinSet<()>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `stream` on its own task. Cancelling `drain` asks the
    /// connection to finish its in-flight requests and close.
    pub fn spawn(
        &mut self,
        stream: TcpStream,
        peer: SocketAddr,
        router: Router,
        drain: CancellationToken,
    ) {
        let id = ConnectionId::next();
        self.tasks.spawn(serve_connection(id, stream, peer, router, drain));
    }

    /// Forget connections that already finished.
    pub fn reap(&mut self) {
        while self.tasks.try_join_next().is_some() {}
    }

    /// Number of connections not yet reaped.
    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every connection to close on its own.
    pub async fn drain(&mut self) {
        while self.tasks.join_next().await.is_some() {}
    }

    /// Abort every remaining connection. Returns how many were still open.
    pub async fn abort_all(&mut self) -> usize {
        self.reap();
        let open = self.tasks.len();
        self.tasks.shutdown().await;
        open
    }
}

async fn serve_connection(
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    drain: CancellationToken,
) {
    let builder = Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection_with_upgrades(
        TokioIo::new(stream),
        TowerToHyperService::new(router),
    );
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(
                        connection_id = %id,
                        peer_addr = %peer,
                        error = %e,
                        "Connection error"
                    );
                }
                break;
            }
            _ = drain.cancelled(), if !draining => {
                draining = true;
                tracing::trace!(connection_id = %id, "Draining connection");
                conn.as_mut().graceful_shutdown();
            }
        }
    }

    tracing::trace!(connection_id = %id, "Connection closed");
}
