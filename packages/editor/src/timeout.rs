//! Timeout policies for outstanding evaluations.
//!
//! Without a policy a segment whose evaluator never answers stays running
//! forever. `NoTimeout` keeps that behavior; hosts opt in to anything else.

use std::fmt::Debug;
use std::time::Duration;

pub trait TimeoutPolicy: Debug + Send {
    /// Whether an evaluation dispatched `elapsed` ago should be given up on
    fn is_expired(&self, elapsed: Duration) -> bool;
}

/// Never expire
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTimeout;

impl TimeoutPolicy for NoTimeout {
    fn is_expired(&self, _elapsed: Duration) -> bool {
        false
    }
}

/// Expire after a fixed duration
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeout(pub Duration);

impl TimeoutPolicy for FixedTimeout {
    fn is_expired(&self, elapsed: Duration) -> bool {
        elapsed >= self.0
    }
}
