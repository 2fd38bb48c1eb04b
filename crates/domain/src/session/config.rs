//! Session configuration.

use std::time::Duration;

use serde::Deserialize;

/// Advertised name of the bulb this session drives.
pub const DEFAULT_TARGET_NAME: &str = "Prestigio RGB Light";

/// Bound on an outstanding connect attempt, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u16 = 10;

/// Configuration for a bulb session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Exact advertised name a peripheral must carry to be selected.
    pub target_name: String,
    /// Connect timeout, in seconds.
    pub connect_timeout_secs: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_name: DEFAULT_TARGET_NAME.to_owned(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl SessionConfig {
    /// The connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }
}
