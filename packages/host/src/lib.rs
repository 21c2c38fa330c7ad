//! # Worksheet Host
//!
//! Runs a worksheet session on its own tokio task so UIs and evaluator
//! transports on other threads can drive it safely. Every command and every
//! evaluator response goes through one queue, which keeps the session's
//! single-threaded invariants intact.

pub mod host;
pub mod options;

pub use host::{HostChannels, HostError, HostHandle, WorksheetHost};
pub use options::HostOptions;
