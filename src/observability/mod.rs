//! Observability subsystem.
//!
//! Every subsystem emits `tracing` events with structured fields
//! (`listener`, `address`, `error`); `logging.rs` installs the subscriber.

pub mod logging;
