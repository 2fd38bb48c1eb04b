//! # bulb-adapter-ble
//!
//! BLE adapter: drives a real Prestigio bulb through the host Bluetooth
//! stack using [`btleplug`].
//!
//! ## How it works
//!
//! [`BtleplugAdapter`] wraps one host adapter (central). Session handles
//! carry the platform peripheral identifier as a string; every operation
//! resolves it back to a btleplug peripheral through the central's known
//! peripherals.
//!
//! | Port operation | btleplug call |
//! |----------------|---------------|
//! | `state_changes` | `adapter_state` + `CentralEvent::StateUpdate` |
//! | `start_scanning` | `start_scan` + `DeviceDiscovered` / `DeviceUpdated` |
//! | `connect` / `reconnect` | `connect`, bounded by a timeout |
//! | `discover_*` | `discover_services` + `services` |
//! | `write` | `write`, with response when supported |
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `bulb-app` and `bulb-domain`.

mod config;
mod error;
mod gatt;
mod scanner;

pub use config::BleConfig;
pub use error::BleError;

use std::time::Duration;

use btleplug::api::{Central as _, CentralEvent, Manager as _, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio_stream::StreamExt as _;

use bulb_app::ports::{BleAdapter, EventStream};
use bulb_domain::error::TransportError;
use bulb_domain::peripheral::{CharacteristicHandle, PeripheralHandle, ServiceHandle};
use bulb_domain::session::AdapterState;

/// [`BleAdapter`] backed by a btleplug central.
pub struct BtleplugAdapter {
    central: Adapter,
    config: BleConfig,
}

impl BtleplugAdapter {
    /// Open the host adapter selected by [`BleConfig::adapter_index`].
    ///
    /// # Errors
    ///
    /// Returns [`BleError::NotAvailable`] when the host has no adapter,
    /// [`BleError::AdapterNotFound`] when the index is out of range, and
    /// [`BleError::Stack`] when the Bluetooth stack cannot be reached.
    pub async fn open(config: BleConfig) -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        if adapters.is_empty() {
            return Err(BleError::NotAvailable);
        }
        let available = adapters.len();
        let central = adapters
            .into_iter()
            .nth(config.adapter_index)
            .ok_or(BleError::AdapterNotFound {
                index: config.adapter_index,
                available,
            })?;

        match central.adapter_info().await {
            Ok(info) => tracing::info!(adapter = %info, "BLE adapter opened"),
            Err(err) => tracing::debug!(%err, "BLE adapter opened, info unavailable"),
        }

        Ok(Self { central, config })
    }

    async fn peripheral(&self, handle: &PeripheralHandle) -> Result<Peripheral, TransportError> {
        let peripherals = self.central.peripherals().await.map_err(BleError::from)?;
        peripherals
            .into_iter()
            .find(|p| p.id().to_string() == handle.id.as_str())
            .ok_or_else(|| TransportError::UnknownPeripheral(handle.id.clone()))
    }

    async fn connect_within(
        &self,
        handle: &PeripheralHandle,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let peripheral = self.peripheral(handle).await?;
        match tokio::time::timeout(timeout, peripheral.connect()).await {
            Ok(result) => result.map_err(|err| BleError::from(err).into_transport()),
            Err(_) => Err(TransportError::ConnectTimeout(timeout)),
        }
    }
}

impl BleAdapter for BtleplugAdapter {
    async fn state_changes(&self) -> Result<EventStream<AdapterState>, TransportError> {
        let events = self.central.events().await.map_err(BleError::from)?;
        let current = self
            .central
            .adapter_state()
            .await
            .map_err(BleError::from)?;
        let updates = events.filter_map(|event| match event {
            CentralEvent::StateUpdate(state) => Some(gatt::adapter_state(state)),
            _ => None,
        });
        Ok(Box::pin(
            tokio_stream::once(gatt::adapter_state(current)).chain(updates),
        ))
    }

    async fn start_scanning(&self) -> Result<EventStream<PeripheralHandle>, TransportError> {
        Ok(scanner::start(&self.central).await?)
    }

    async fn stop_scanning(&self) -> Result<(), TransportError> {
        self.central.stop_scan().await.map_err(BleError::from)?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), TransportError> {
        // btleplug exposes no reset; the host stack recovers on its own and
        // reports the new state through the event stream
        tracing::debug!("adapter reset left to the host stack");
        Ok(())
    }

    async fn connect(
        &self,
        peripheral: &PeripheralHandle,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        self.connect_within(peripheral, timeout).await
    }

    async fn reconnect(&self, peripheral: &PeripheralHandle) -> Result<(), TransportError> {
        self.connect_within(peripheral, self.config.reconnect_timeout())
            .await
    }

    async fn discover_services(
        &self,
        peripheral: &PeripheralHandle,
    ) -> Result<Vec<ServiceHandle>, TransportError> {
        let peripheral = self.peripheral(peripheral).await?;
        peripheral
            .discover_services()
            .await
            .map_err(BleError::from)?;
        Ok(peripheral.services().iter().map(gatt::service_handle).collect())
    }

    async fn discover_characteristics(
        &self,
        peripheral: &PeripheralHandle,
        service: &ServiceHandle,
    ) -> Result<Vec<CharacteristicHandle>, TransportError> {
        let peripheral = self.peripheral(peripheral).await?;
        let found = peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == service.uuid)
            .ok_or(BleError::ServiceNotFound { uuid: service.uuid })?;
        Ok(found
            .characteristics
            .iter()
            .map(gatt::characteristic_handle)
            .collect())
    }

    async fn write(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &CharacteristicHandle,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let peripheral = self.peripheral(peripheral).await?;
        if !peripheral.is_connected().await.map_err(BleError::from)? {
            return Err(TransportError::Disconnected);
        }
        let target = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic.uuid && c.service_uuid == characteristic.service)
            .ok_or(TransportError::CharacteristicUnavailable(characteristic.uuid))?;
        let write_type = if characteristic.write_without_response {
            WriteType::WithoutResponse
        } else {
            WriteType::WithResponse
        };
        peripheral
            .write(&target, payload, write_type)
            .await
            .map_err(BleError::from)?;
        Ok(())
    }
}
