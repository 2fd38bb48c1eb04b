//! Outputs of the session state machine.

use std::time::Duration;

use crate::command::Command;
use crate::error::SendError;
use crate::peripheral::{CharacteristicHandle, PeripheralHandle, ServiceHandle};
use crate::token::CorrelationToken;

/// Work the driver must carry out after a transition.
#[derive(Debug)]
pub enum Effect {
    /// Start listening to adapter state changes.
    SubscribeAdapterState,
    /// Start scanning for peripherals.
    StartScan,
    /// Stop scanning.
    StopScan,
    /// Reset the adapter.
    ResetAdapter,
    /// Connect to the selected peripheral.
    Connect {
        /// Target peripheral.
        peripheral: PeripheralHandle,
        /// Bound on the attempt.
        timeout: Duration,
    },
    /// Reconnect to the retained peripheral.
    Reconnect {
        /// Target peripheral.
        peripheral: PeripheralHandle,
    },
    /// Discover all services of the connected peripheral.
    DiscoverServices {
        /// Target peripheral.
        peripheral: PeripheralHandle,
    },
    /// Discover the characteristics of one service.
    DiscoverCharacteristics {
        /// Target peripheral.
        peripheral: PeripheralHandle,
        /// Service to inspect.
        service: ServiceHandle,
    },
    /// Write a command to the bulb.
    Write {
        /// Target peripheral.
        peripheral: PeripheralHandle,
        /// Writable characteristic.
        characteristic: CharacteristicHandle,
        /// Payload and token.
        command: Command,
    },
    /// Tell the observer something.
    Notify(Notification),
}

/// Lifecycle and send-outcome notifications delivered to the observer.
#[derive(Debug)]
pub enum Notification {
    /// The adapter became usable (`true`) or unusable (`false`).
    StateChanged {
        /// Whether scanning is possible.
        can_scan: bool,
    },
    /// A connect or reconnect succeeded.
    Connected,
    /// A connect or reconnect failed.
    NotConnected,
    /// A writable characteristic was found; commands are accepted.
    BulbFound,
    /// Discovery finished without a writable characteristic.
    BulbNotFound,
    /// A command was written.
    CommandSent {
        /// Token supplied with the command.
        token: Option<CorrelationToken>,
        /// Hex rendering of the payload.
        payload_hex: String,
    },
    /// A command could not be written.
    CommandFailed {
        /// Token supplied with the command.
        token: Option<CorrelationToken>,
        /// Hex rendering of the payload.
        payload_hex: String,
        /// Why.
        error: SendError,
    },
}
