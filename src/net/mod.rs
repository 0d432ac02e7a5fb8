//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, fatal vs per-connection errors)
//!     → connection.rs (one task per connection, drain or abort)
//!     → Hand off to the listener's router
//! ```

pub mod connection;
pub mod listener;

pub use connection::Connections;
pub use listener::{Listener, ListenerError};
