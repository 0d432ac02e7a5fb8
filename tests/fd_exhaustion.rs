//! Running out of file descriptors must not bring the listener down.
//!
//! Kept in its own test binary: the descriptor limit is process-wide.

#![cfg(unix)]

mod common;

use std::fs::File;
use std::time::Duration;

use listener_group::http::api_router;
use listener_group::lifecycle::run_listener;
use listener_group::{HttpListener, ShutdownCoordinator};
use nix::sys::resource::{getrlimit, setrlimit, Resource};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const LOW_LIMIT: u64 = 256;

#[tokio::test]
async fn listener_survives_descriptor_exhaustion() {
    let (socket, addr) = common::ephemeral().await;
    let listener = HttpListener::bound("api", socket, api_router());
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
    coordinator.register(listener.handle());
    let serving = tokio::spawn(run_listener(
        "api".into(),
        coordinator.clone(),
        listener.serve(),
    ));

    let (soft, hard) = getrlimit(Resource::RLIMIT_NOFILE).unwrap();
    setrlimit(Resource::RLIMIT_NOFILE, LOW_LIMIT.min(soft), hard).unwrap();

    let mut hogs = Vec::new();
    loop {
        match File::open("/dev/null") {
            Ok(file) => hogs.push(file),
            Err(e) => {
                assert_eq!(e.raw_os_error(), Some(libc::EMFILE));
                break;
            }
        }
    }

    // Leave exactly one slot for the client side; the server cannot accept.
    hogs.pop();
    let mut client = TcpStream::connect(addr).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!coordinator.is_shutdown_requested());
    assert!(!serving.is_finished());

    drop(hogs);
    setrlimit(Resource::RLIMIT_NOFILE, soft, hard).unwrap();

    client
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_string(&mut response))
        .await
        .expect("queued connection must be served once descriptors free up")
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("hello world"), "{response}");

    assert!(coordinator.trigger_shutdown().await);
    let served = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("listener must stop")
        .unwrap();
    assert!(served.is_ok(), "{served:?}");
}
