use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime options for a worksheet host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostOptions {
    /// Capacity of the command queue feeding the session
    pub queue_capacity: usize,

    /// Give up on evaluations after this long. `None` waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_timeout_ms: Option<u64>,

    /// How often outstanding evaluations are checked against the timeout
    pub sweep_interval_ms: u64,
}

impl HostOptions {
    pub fn evaluation_timeout(&self) -> Option<Duration> {
        self.evaluation_timeout_ms.map(Duration::from_millis)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            evaluation_timeout_ms: None,
            sweep_interval_ms: 1000,
        }
    }
}
