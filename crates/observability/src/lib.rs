//! Tracing setup shared by the binaries.

/// Subscriber configuration (filters, format, output).
pub mod subscriber;

pub use subscriber::{DEFAULT_FILTER, init, init_with_default};
