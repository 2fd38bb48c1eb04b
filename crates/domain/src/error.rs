//! Error types shared across the workspace.
//!
//! - [`SessionError`]: why the session pipeline stopped (terminal reasons).
//! - [`TransportError`]: a single adapter operation failed.
//! - [`SendError`]: why a command send failed; carried by the failure
//!   notification, never returned synchronously.
//! - [`CommandError`]: a raw payload is not a valid command.

use std::time::Duration;

use serde::Serialize;

use crate::peripheral::PeripheralId;

/// Session-level failures.
///
/// All variants except [`SessionError::Resetting`] are terminal for the
/// scan/connect pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SessionError {
    /// The BLE adapter is powered off.
    #[error("bluetooth is powered off")]
    PoweredOff,

    /// The BLE adapter is unauthorized or unsupported on this host.
    #[error("bluetooth is unauthorized or unsupported")]
    InvalidState,

    /// The BLE adapter is resetting.
    #[error("bluetooth adapter is resetting")]
    Resetting,

    /// The BLE adapter reported an unknown state.
    #[error("bluetooth adapter state is unknown")]
    Unknown,

    /// An internal invariant was violated (e.g. the adapter lost track of
    /// the selected peripheral).
    #[error("unexpected session state")]
    Unlikely,

    /// Discovery finished without a writable characteristic.
    #[error("no writable characteristic found on the bulb")]
    ServiceNotFound,

    /// The initial connection attempt failed.
    #[error("failed to connect to the bulb")]
    ConnectFailed,

    /// The automatic reconnect after a disconnect failed.
    #[error("failed to reconnect to the bulb")]
    ReconnectFailed,
}

/// Failure of a single adapter operation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection attempt did not complete in time.
    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The peripheral is not connected.
    #[error("peripheral disconnected")]
    Disconnected,

    /// The adapter does not know the given peripheral.
    #[error("unknown peripheral {0}")]
    UnknownPeripheral(PeripheralId),

    /// The characteristic is not exposed by the connected peripheral.
    #[error("characteristic {0} is not available")]
    CharacteristicUnavailable(uuid::Uuid),

    /// Any other failure reported by the BLE stack.
    #[error("BLE adapter error")]
    Adapter(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Whether this failure means the link to the peripheral was lost.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

/// Why a command could not be sent.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The session has no writable characteristic right now.
    #[error("bulb session is not ready")]
    NotReady,

    /// The write itself failed.
    #[error("write failed")]
    Transport(#[from] TransportError),
}

/// A raw payload could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Payloads are fixed-size.
    #[error("command payload must be {expected} bytes, got {actual}")]
    WrongLength {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// Byte 0 is not a known opcode.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),
}
