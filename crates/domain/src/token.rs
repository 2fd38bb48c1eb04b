//! Correlation tokens attached to commands and echoed back in outcome
//! notifications.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque caller-supplied identifier matching a send outcome to its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(uuid::Uuid);

impl Default for CorrelationToken {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl CorrelationToken {
    /// Generate a new random token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Access the inner UUID.
    #[must_use]
    pub fn as_uuid(self) -> uuid::Uuid {
        self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CorrelationToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_unique_tokens() {
        assert_ne!(CorrelationToken::new(), CorrelationToken::new());
    }

    #[test]
    fn should_roundtrip_through_display_and_parse() {
        let token = CorrelationToken::new();
        let parsed: CorrelationToken = token.to_string().parse().unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn should_reject_invalid_token_string() {
        assert!("not-a-token".parse::<CorrelationToken>().is_err());
    }

    #[test]
    fn should_serialize_as_plain_uuid_string() {
        let uuid = uuid::Uuid::from_u128(0x1234);
        let token = CorrelationToken::from_uuid(uuid);
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
        assert_eq!(token.as_uuid(), uuid);
    }
}
