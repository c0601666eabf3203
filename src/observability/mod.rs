//! Logging setup for the command-line binary.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the embedding process.

mod tracing_init;

pub use tracing_init::{TracingError, init_tracing};
