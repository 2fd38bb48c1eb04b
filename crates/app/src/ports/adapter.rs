//! BLE adapter port: the capabilities the session consumes.
//!
//! An adapter bridges a BLE stack (btleplug, a simulator, …) into the
//! session. Every operation resolves asynchronously; the session driver runs
//! each one on its own task and feeds the outcome back into the state
//! machine, so implementations never see concurrent calls for the same step.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio_stream::Stream;

use bulb_domain::error::TransportError;
use bulb_domain::peripheral::{CharacteristicHandle, PeripheralHandle, ServiceHandle};
use bulb_domain::session::AdapterState;

/// Boxed stream of adapter notifications.
pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// A BLE central the session can drive.
///
/// Handles passed in are the ones the adapter produced earlier; adapters
/// resolve them back to platform objects by identifier and return
/// [`TransportError::UnknownPeripheral`] when they cannot.
pub trait BleAdapter: Send + Sync + 'static {
    /// Subscribe to adapter power/authorisation changes.
    ///
    /// The stream yields the current state first, then every change.
    fn state_changes(
        &self,
    ) -> impl Future<Output = Result<EventStream<AdapterState>, TransportError>> + Send;

    /// Start scanning; the stream yields every advertising peripheral.
    ///
    /// The same peripheral may be reported more than once.
    fn start_scanning(
        &self,
    ) -> impl Future<Output = Result<EventStream<PeripheralHandle>, TransportError>> + Send;

    /// Stop an active scan. Stopping when idle is not an error.
    fn stop_scanning(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Reset the adapter after it reported `Resetting`.
    ///
    /// The default implementation does nothing, for stacks that recover on
    /// their own.
    fn reset(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        async { Ok(()) }
    }

    /// Connect, failing with [`TransportError::ConnectTimeout`] once
    /// `timeout` elapses.
    fn connect(
        &self,
        peripheral: &PeripheralHandle,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Reconnect to a peripheral that dropped its link.
    fn reconnect(
        &self,
        peripheral: &PeripheralHandle,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// List the services of a connected peripheral.
    fn discover_services(
        &self,
        peripheral: &PeripheralHandle,
    ) -> impl Future<Output = Result<Vec<ServiceHandle>, TransportError>> + Send;

    /// List the characteristics of one service.
    fn discover_characteristics(
        &self,
        peripheral: &PeripheralHandle,
        service: &ServiceHandle,
    ) -> impl Future<Output = Result<Vec<CharacteristicHandle>, TransportError>> + Send;

    /// Write raw bytes to a characteristic.
    ///
    /// Must fail with [`TransportError::Disconnected`] when the link is
    /// down so the session can reconnect.
    fn write(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &CharacteristicHandle,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: BleAdapter> BleAdapter for Arc<T> {
    fn state_changes(
        &self,
    ) -> impl Future<Output = Result<EventStream<AdapterState>, TransportError>> + Send {
        (**self).state_changes()
    }

    fn start_scanning(
        &self,
    ) -> impl Future<Output = Result<EventStream<PeripheralHandle>, TransportError>> + Send {
        (**self).start_scanning()
    }

    fn stop_scanning(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).stop_scanning()
    }

    fn reset(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).reset()
    }

    fn connect(
        &self,
        peripheral: &PeripheralHandle,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).connect(peripheral, timeout)
    }

    fn reconnect(
        &self,
        peripheral: &PeripheralHandle,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).reconnect(peripheral)
    }

    fn discover_services(
        &self,
        peripheral: &PeripheralHandle,
    ) -> impl Future<Output = Result<Vec<ServiceHandle>, TransportError>> + Send {
        (**self).discover_services(peripheral)
    }

    fn discover_characteristics(
        &self,
        peripheral: &PeripheralHandle,
        service: &ServiceHandle,
    ) -> impl Future<Output = Result<Vec<CharacteristicHandle>, TransportError>> + Send {
        (**self).discover_characteristics(peripheral, service)
    }

    fn write(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &CharacteristicHandle,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).write(peripheral, characteristic, payload)
    }
}
