//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `bulbctl.toml` in the working directory (or the path in
//! `BULBCTL_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::str::FromStr;

use serde::Deserialize;

use bulb_adapter_ble::BleConfig;
use bulb_domain::session::SessionConfig;

const DEFAULT_PATH: &str = "bulbctl.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which bulb to look for and how long to wait for it.
    pub bulb: SessionConfig,
    /// BLE backend selection.
    pub backend: BackendConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Which adapter drives the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The host Bluetooth stack.
    #[default]
    Ble,
    /// The simulated bulb.
    Virtual,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ble" => Ok(Self::Ble),
            "virtual" => Ok(Self::Virtual),
            other => Err(ConfigError::Validation(format!(
                "unknown backend {other:?}, expected \"ble\" or \"virtual\""
            ))),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Adapter implementation.
    pub kind: BackendKind,
    /// Host adapter index (BLE backend only).
    pub adapter_index: usize,
    /// Reconnect timeout in seconds (BLE backend only).
    pub reconnect_timeout_secs: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let ble = BleConfig::default();
        Self {
            kind: BackendKind::default(),
            adapter_index: ble.adapter_index,
            reconnect_timeout_secs: ble.reconnect_timeout_secs,
        }
    }
}

impl BackendConfig {
    /// Settings for the btleplug adapter.
    #[must_use]
    pub fn ble(&self) -> BleConfig {
        BleConfig {
            adapter_index: self.adapter_index,
            reconnect_timeout_secs: self.reconnect_timeout_secs,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "bulbctl=info,bulb_app=info,bulb_adapter_ble=info,bulb_adapter_virtual=info"
                .to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `bulbctl.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("BULBCTL_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("BULBCTL_TARGET_NAME") {
            self.bulb.target_name = val;
        }
        if let Some(val) = var("BULBCTL_BACKEND")
            && let Ok(kind) = val.parse()
        {
            self.backend.kind = kind;
        }
        if let Some(val) = var("BULBCTL_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bulb.target_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bulb target name must not be empty".to_string(),
            ));
        }
        if self.bulb.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "connect timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.bulb.target_name, "Prestigio RGB Light");
        assert_eq!(config.bulb.connect_timeout_secs, 10);
        assert_eq!(config.backend.kind, BackendKind::Ble);
        assert_eq!(config.backend.adapter_index, 0);
        assert!(config.logging.filter.contains("bulbctl=info"));
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bulb.target_name, "Prestigio RGB Light");
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [bulb]
            target_name = 'Desk Lamp'
            connect_timeout_secs = 5

            [backend]
            kind = 'virtual'
            adapter_index = 1
            reconnect_timeout_secs = 3

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.bulb.target_name, "Desk Lamp");
        assert_eq!(config.bulb.connect_timeout_secs, 5);
        assert_eq!(config.backend.kind, BackendKind::Virtual);
        assert_eq!(
            config.backend.ble(),
            BleConfig {
                adapter_index: 1,
                reconnect_timeout_secs: 3,
            }
        );
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [backend]
            kind = 'virtual'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Virtual);
        assert_eq!(config.backend.reconnect_timeout_secs, 10);
        assert_eq!(config.bulb.connect_timeout_secs, 10);
    }

    #[test]
    fn should_report_parse_error_for_unknown_backend() {
        let result: Result<Config, _> = toml::from_str("[backend]\nkind = 'zigbee'");
        assert!(result.is_err());
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.bulb.target_name, "Prestigio RGB Light");
    }

    #[test]
    fn should_apply_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("BULBCTL_TARGET_NAME", "Kitchen"),
            ("BULBCTL_BACKEND", "Virtual"),
            ("BULBCTL_LOG", "trace"),
        ]));
        assert_eq!(config.bulb.target_name, "Kitchen");
        assert_eq!(config.backend.kind, BackendKind::Virtual);
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_prefer_rust_log_over_bulbctl_log() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("BULBCTL_LOG", "trace"), ("RUST_LOG", "warn")]));
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn should_ignore_unknown_backend_override() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("BULBCTL_BACKEND", "zigbee")]));
        assert_eq!(config.backend.kind, BackendKind::Ble);
    }

    #[test]
    fn should_reject_empty_target_name() {
        let mut config = Config::default();
        config.bulb.target_name = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn should_reject_zero_timeout() {
        let mut config = Config::default();
        config.bulb.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }
}
