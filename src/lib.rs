//! Coordinated graceful shutdown for a group of HTTP listeners.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────── TaskGroup ────────────────────────────┐
//!   │                                                                    │
//!   │  api listener ──┐                                   ┌── stop api   │
//!   │                 ├─ exits ─▶ ShutdownCoordinator ────┤              │
//!   │  health listener┘          (fires exactly once)     └── stop health│
//!   │                                  ▲                                 │
//!   │  signal watcher ─ SIGINT/SIGTERM ┘                                 │
//!   │                                                                    │
//!   └──────────────── wait(): all tasks joined, first error ─────────────┘
//! ```
//!
//! Whichever task finishes first, a listener failing or exiting or a
//! signal arriving, stops every other listener within the grace period.

pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use app::App;
pub use config::AppConfig;
pub use error::Error;
pub use http::HttpListener;
pub use lifecycle::{ShutdownCoordinator, ShutdownSignal, TaskGroup};
