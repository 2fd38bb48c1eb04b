//! Session states and their serialisable snapshot.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::SessionError;
use crate::peripheral::{CharacteristicHandle, PeripheralHandle, PeripheralId};

/// Where the session is in its lifecycle.
///
/// Handles only live in the variants where they are valid: the writable
/// characteristic is usable exclusively in [`SessionState::Ready`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Not started.
    #[default]
    Idle,
    /// Waiting for the adapter to power on.
    AdapterUnready,
    /// Scanning for the target name.
    Scanning,
    /// A connect or reconnect is in flight.
    Connecting {
        /// Selected peripheral.
        peripheral: PeripheralHandle,
        /// Initial connect or reconnect.
        attempt: ConnectAttempt,
    },
    /// Looking for the writable characteristic.
    Discovering {
        /// Connected peripheral.
        peripheral: PeripheralHandle,
        /// Discovery progress.
        stage: DiscoveryStage,
    },
    /// Commands are accepted.
    Ready {
        /// Connected peripheral.
        peripheral: PeripheralHandle,
        /// Writable characteristic.
        characteristic: CharacteristicHandle,
    },
    /// Terminal.
    Failed(SessionError),
}

/// Kind of connect attempt in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectAttempt {
    /// First connection after the scan matched.
    Initial,
    /// Automatic reconnect after a disconnect.
    Reconnect {
        /// Characteristic to resume with, without rediscovery. `None` when
        /// the link dropped before discovery finished.
        characteristic: Option<CharacteristicHandle>,
    },
}

/// Discovery progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStage {
    /// Waiting for the service list.
    Services,
    /// Waiting for per-service characteristic results.
    Characteristics {
        /// Services whose results are still outstanding.
        pending: BTreeSet<uuid::Uuid>,
    },
}

impl SessionState {
    /// The selected peripheral, in states that hold one.
    #[must_use]
    pub fn peripheral(&self) -> Option<&PeripheralHandle> {
        match self {
            Self::Connecting { peripheral, .. }
            | Self::Discovering { peripheral, .. }
            | Self::Ready { peripheral, .. } => Some(peripheral),
            Self::Idle | Self::AdapterUnready | Self::Scanning | Self::Failed(_) => None,
        }
    }

    /// The writable characteristic; only present when ready.
    #[must_use]
    pub fn characteristic(&self) -> Option<&CharacteristicHandle> {
        match self {
            Self::Ready { characteristic, .. } => Some(characteristic),
            _ => None,
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Snapshot for status displays.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Idle => SessionStatus::Idle,
            Self::AdapterUnready => SessionStatus::AdapterUnready,
            Self::Scanning => SessionStatus::Scanning,
            Self::Connecting {
                peripheral,
                attempt,
            } => SessionStatus::Connecting {
                peripheral: peripheral.id.clone(),
                reconnect: matches!(attempt, ConnectAttempt::Reconnect { .. }),
            },
            Self::Discovering { peripheral, .. } => SessionStatus::Discovering {
                peripheral: peripheral.id.clone(),
            },
            Self::Ready { peripheral, .. } => SessionStatus::Ready {
                peripheral: peripheral.id.clone(),
                name: peripheral.name.clone(),
            },
            Self::Failed(reason) => SessionStatus::Failed { reason: *reason },
        }
    }
}

/// Serialisable summary of a [`SessionState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Not started.
    #[default]
    Idle,
    /// Waiting for the adapter.
    AdapterUnready,
    /// Scanning.
    Scanning,
    /// Connecting.
    Connecting {
        /// Selected peripheral.
        peripheral: PeripheralId,
        /// Whether this is the automatic reconnect.
        reconnect: bool,
    },
    /// Discovering.
    Discovering {
        /// Connected peripheral.
        peripheral: PeripheralId,
    },
    /// Ready for commands.
    Ready {
        /// Connected peripheral.
        peripheral: PeripheralId,
        /// Advertised name.
        name: Option<String>,
    },
    /// Failed.
    Failed {
        /// Why.
        reason: SessionError,
    },
}

impl SessionStatus {
    /// Short label for status indicators.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AdapterUnready => "waiting for bluetooth",
            Self::Scanning => "scanning",
            Self::Connecting { .. } => "connecting",
            Self::Discovering { .. } => "discovering",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
        }
    }
}
