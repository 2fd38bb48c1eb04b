//! Inputs to the session state machine.

use serde::Serialize;

use crate::command::Command;
use crate::error::{SessionError, TransportError};
use crate::peripheral::{CharacteristicHandle, PeripheralHandle, ServiceHandle};

/// Power/authorisation state reported by the BLE adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    /// Ready to scan.
    PoweredOn,
    /// Radio switched off.
    PoweredOff,
    /// The process is not allowed to use bluetooth.
    Unauthorized,
    /// The host has no usable BLE support.
    Unsupported,
    /// The stack is restarting.
    Resetting,
    /// The stack has not reported a state yet.
    Unknown,
}

impl AdapterState {
    /// Map the adapter state onto the session error taxonomy.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] matching every state except
    /// [`AdapterState::PoweredOn`].
    pub fn check(self) -> Result<(), SessionError> {
        match self {
            Self::PoweredOn => Ok(()),
            Self::PoweredOff => Err(SessionError::PoweredOff),
            Self::Unauthorized | Self::Unsupported => Err(SessionError::InvalidState),
            Self::Resetting => Err(SessionError::Resetting),
            Self::Unknown => Err(SessionError::Unknown),
        }
    }
}

/// Something that happened: a caller request or an adapter result.
#[derive(Debug)]
pub enum SessionEvent {
    /// The caller asked the session to start.
    Start,
    /// The adapter reported a new state.
    AdapterStateChanged(AdapterState),
    /// A scan produced a peripheral.
    PeripheralDiscovered(PeripheralHandle),
    /// The outstanding connect or reconnect succeeded.
    Connected,
    /// The outstanding connect or reconnect failed.
    ConnectFailed(TransportError),
    /// Service discovery finished.
    ServicesDiscovered(Vec<ServiceHandle>),
    /// Service discovery failed.
    ServiceDiscoveryFailed(TransportError),
    /// Characteristic discovery for one service finished.
    CharacteristicsDiscovered {
        /// The service that was inspected.
        service: ServiceHandle,
        /// Link generation the discovery ran on.
        link: u32,
        /// Its characteristics, in discovery order.
        characteristics: Vec<CharacteristicHandle>,
    },
    /// Characteristic discovery for one service failed.
    CharacteristicDiscoveryFailed {
        /// The service that was inspected.
        service: ServiceHandle,
        /// Link generation the discovery ran on.
        link: u32,
        /// Why it failed.
        error: TransportError,
    },
    /// The caller wants a command written.
    SendRequested(Command),
    /// A write resolved.
    WriteCompleted {
        /// The command that was written.
        command: Command,
        /// Link generation the write was issued on.
        link: u32,
        /// Outcome of the write.
        result: Result<(), TransportError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_only_powered_on() {
        assert_eq!(AdapterState::PoweredOn.check(), Ok(()));
    }

    #[test]
    fn should_map_failing_states_to_session_errors() {
        assert_eq!(
            AdapterState::PoweredOff.check(),
            Err(SessionError::PoweredOff)
        );
        assert_eq!(
            AdapterState::Unauthorized.check(),
            Err(SessionError::InvalidState)
        );
        assert_eq!(
            AdapterState::Unsupported.check(),
            Err(SessionError::InvalidState)
        );
        assert_eq!(
            AdapterState::Resetting.check(),
            Err(SessionError::Resetting)
        );
        assert_eq!(AdapterState::Unknown.check(), Err(SessionError::Unknown));
    }
}
