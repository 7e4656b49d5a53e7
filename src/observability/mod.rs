//! Observability for the standalone server.
//!
//! Structured logging through `tracing-subscriber`, configured from
//! [`LoggingConfig`](crate::config::LoggingConfig). Library users install
//! their own subscriber; the IdP only emits `tracing` events.

mod tracing_init;

pub use tracing_init::*;
