//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, per-connection HTTP/1.1 + HTTP/2)
//!     → handlers.rs (static routes)
//!     → Send to client
//! ```

pub mod handlers;
pub mod server;

pub use handlers::{api_router, health_router};
pub use server::HttpListener;
