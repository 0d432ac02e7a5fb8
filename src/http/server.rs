//! HTTP listener.
//!
//! # Responsibilities
//! - Bind the listener's address (or take an already bound socket)
//! - Serve HTTP/1.1 and HTTP/2 through the listener's Axum router
//! - On a stop request: stop accepting, drain in-flight connections, and
//!   force-close what is left once the grace period has run out

use std::net::SocketAddr;

use axum::Router;

use crate::lifecycle::{ListenerControl, ListenerHandle};
use crate::net::{Connections, Listener, ListenerError};

enum Binding {
    Address(SocketAddr),
    Bound(Listener),
}

/// One named HTTP listener and its shutdown handle.
pub struct HttpListener {
    name: String,
    binding: Binding,
    router: Router,
    handle: ListenerHandle,
    control: ListenerControl,
}

impl HttpListener {
    /// A listener that binds `addr` when served.
    pub fn new(name: impl Into<String>, addr: SocketAddr, router: Router) -> Self {
        Self::with_binding(name.into(), Binding::Address(addr), router)
    }

    /// A listener serving an already bound socket.
    pub fn bound(name: impl Into<String>, listener: Listener, router: Router) -> Self {
        Self::with_binding(name.into(), Binding::Bound(listener), router)
    }

    fn with_binding(name: String, binding: Binding, router: Router) -> Self {
        let (handle, control) = ListenerHandle::new(name.as_str());
        Self {
            name,
            binding,
            router,
            handle,
            control,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shutdown handle to register with a coordinator.
    pub fn handle(&self) -> ListenerHandle {
        self.handle.clone()
    }

    /// Bind if needed, then serve until a stop is requested or accepting fails.
    ///
    /// Returns `Ok(())` once a requested stop has finished draining.
    pub async fn serve(self) -> Result<(), ListenerError> {
        let Self {
            name,
            binding,
            router,
            control,
            ..
        } = self;

        let listener = match binding {
            Binding::Address(addr) => Listener::bind(addr).await?,
            Binding::Bound(listener) => listener,
        };
        tracing::info!(
            listener = %name,
            address = %listener.local_addr(),
            "HTTP listener starting"
        );

        let mut connections = Connections::new();
        let result = loop {
            tokio::select! {
                _ = control.stop_requested() => break Ok(()),
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.reap();
                        connections.spawn(stream, peer, router.clone(), control.drain_token());
                    }
                    Err(e) => break Err(e),
                },
            }
        };
        drop(listener);

        match &result {
            Ok(()) => drain(&name, &control, &mut connections).await,
            Err(e) => {
                let open = connections.abort_all().await;
                tracing::error!(
                    listener = %name,
                    error = %e,
                    open_connections = open,
                    "HTTP listener failed"
                );
            }
        }

        tracing::info!(listener = %name, "HTTP listener stopped");
        result
    }
}

async fn drain(name: &str, control: &ListenerControl, connections: &mut Connections) {
    connections.reap();
    tracing::info!(
        listener = %name,
        open_connections = connections.len(),
        "Draining connections"
    );

    tokio::select! {
        _ = connections.drain() => {}
        _ = control.force_requested() => {
            let open = connections.abort_all().await;
            tracing::warn!(
                listener = %name,
                open_connections = open,
                "Grace period elapsed, closing remaining connections"
            );
        }
    }
}
