//! Handles to BLE objects held by the session.
//!
//! Handles are plain descriptors; adapters map them back onto their own
//! platform objects by identifier.

use std::fmt;

use serde::Serialize;

/// Platform identifier of a peripheral (a MAC address on Linux/Windows, a
/// UUID on macOS).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PeripheralId(String);

impl PeripheralId {
    /// Borrow the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PeripheralId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PeripheralId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A discovered peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeripheralHandle {
    /// Unique identifier.
    pub id: PeripheralId,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Whether the session currently believes the link is up.
    pub connected: bool,
    /// Link generation, bumped on every reconnect. Results carrying an older
    /// generation belong to a dropped link.
    pub link: u32,
}

impl PeripheralHandle {
    /// A freshly discovered, not yet connected peripheral.
    pub fn new(id: impl Into<PeripheralId>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            connected: false,
            link: 0,
        }
    }

    /// Exact match of the advertised name.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

/// A discovered GATT service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceHandle {
    /// Service UUID.
    pub uuid: uuid::Uuid,
    /// Whether this is a primary service.
    pub primary: bool,
}

/// A discovered GATT characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CharacteristicHandle {
    /// Characteristic UUID.
    pub uuid: uuid::Uuid,
    /// UUID of the owning service.
    pub service: uuid::Uuid,
    /// Accepts writes (with or without response).
    pub can_write: bool,
    /// Only accepts write-without-response.
    pub write_without_response: bool,
}
