//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use listener_group::net::Listener;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;

/// Bind a listener on an ephemeral localhost port.
pub async fn ephemeral() -> (Listener, SocketAddr) {
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr();
    (listener, addr)
}

/// Like [`ephemeral`], also returning the raw descriptor of the listening
/// socket so a test can break it from outside.
#[cfg(unix)]
#[allow(dead_code)]
pub fn ephemeral_with_fd() -> (Listener, SocketAddr, std::os::fd::RawFd) {
    use std::os::fd::AsRawFd;

    let socket = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    socket.set_nonblocking(true).unwrap();
    let fd = socket.as_raw_fd();
    let socket = tokio::net::TcpListener::from_std(socket).unwrap();
    let listener = Listener::from_tcp(socket).unwrap();
    let addr = listener.local_addr();
    (listener, addr, fd)
}

/// Send a keep-alive `GET /` on `stream` and read until `body` shows up.
#[allow(dead_code)]
pub async fn keep_alive_get(stream: &mut TcpStream, body: &str) {
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut chunk = [0u8; 1024];
    while !String::from_utf8_lossy(&received).contains(body) {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the response arrived");
        received.extend_from_slice(&chunk[..n]);
    }
}

/// Client that never reuses connections and ignores proxy settings.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Router whose root handler takes `delay` before answering `done`.
///
/// The returned `Notify` is signalled as each request starts.
#[allow(dead_code)]
pub fn slow_router(delay: Duration) -> (Router, Arc<Notify>) {
    let started = Arc::new(Notify::new());
    let notify = started.clone();
    let router = Router::new().route(
        "/",
        get(move || {
            let notify = notify.clone();
            async move {
                notify.notify_one();
                tokio::time::sleep(delay).await;
                "done"
            }
        }),
    );
    (router, started)
}

/// GET `path` on `addr`, returning status and body.
pub async fn get_text(addr: SocketAddr, path: &str) -> Result<(u16, String), reqwest::Error> {
    let res = client().get(format!("http://{addr}{path}")).send().await?;
    let status = res.status().as_u16();
    Ok((status, res.text().await?))
}

/// Poll `addr` until `path` answers 200.
#[allow(dead_code)]
pub async fn wait_until_serving(addr: SocketAddr, path: &str) {
    for _ in 0..50 {
        if let Ok((200, _)) = get_text(addr, path).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{addr}{path} never became ready");
}
