//! BLE adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the btleplug-backed adapter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Which host adapter to use, in the order the stack lists them.
    pub adapter_index: usize,
    /// Bound on the automatic reconnect, in seconds.
    pub reconnect_timeout_secs: u16,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            reconnect_timeout_secs: 10,
        }
    }
}

impl BleConfig {
    /// The reconnect timeout as a [`Duration`].
    #[must_use]
    pub fn reconnect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.reconnect_timeout_secs))
    }
}
