//! # bulb-adapter-virtual
//!
//! Virtual BLE adapter that simulates a Prestigio bulb for testing and
//! demonstration purposes.
//!
//! ## Simulated world
//!
//! | Piece | Behaviour |
//! |-------|-----------|
//! | Adapter | Reports the configured states, then whatever [`VirtualBulbAdapter::set_adapter_state`] pushes |
//! | Scan | Advertises the configured peripherals once each |
//! | Links | Connect/reconnect/write follow scripted [`Outcome`]s; [`VirtualBulbAdapter::drop_link`] cuts a link |
//! | Bulb | Interprets written payloads: handshake progress, last colour and intensity |
//!
//! Every adapter call is recorded as an [`AdapterCall`] for assertions.
//!
//! ## Dependency rule
//!
//! Depends on `bulb-app` (port traits) and `bulb-domain` only.

mod config;
mod firmware;

pub use config::{
    Outcome, VIRTUAL_BULB_ID, VirtualBulbConfig, VirtualPeripheral, VirtualService, short_uuid,
};
pub use firmware::{FirmwareState, Handshake};

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::WatchStream;

use bulb_app::ports::{BleAdapter, EventStream};
use bulb_domain::error::TransportError;
use bulb_domain::peripheral::{CharacteristicHandle, PeripheralHandle, PeripheralId, ServiceHandle};
use bulb_domain::session::AdapterState;

use firmware::Firmware;

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    /// `state_changes`
    SubscribeState,
    /// `start_scanning`
    StartScan,
    /// `stop_scanning`
    StopScan,
    /// `reset`
    Reset,
    /// `connect`
    Connect(PeripheralId),
    /// `reconnect`
    Reconnect(PeripheralId),
    /// `discover_services`
    DiscoverServices(PeripheralId),
    /// `discover_characteristics`
    DiscoverCharacteristics(uuid::Uuid),
    /// `write`, with the raw payload
    Write(Vec<u8>),
}

#[derive(Debug, Default)]
struct Links {
    connected: HashSet<PeripheralId>,
    connect_outcomes: VecDeque<Outcome>,
    reconnect_outcomes: VecDeque<Outcome>,
    write_outcomes: VecDeque<Outcome>,
}

/// [`BleAdapter`] over a simulated radio and bulb.
pub struct VirtualBulbAdapter {
    config: VirtualBulbConfig,
    state_tx: watch::Sender<AdapterState>,
    links: Mutex<Links>,
    firmware: Mutex<Firmware>,
    calls: Mutex<Vec<AdapterCall>>,
}

impl Default for VirtualBulbAdapter {
    fn default() -> Self {
        Self::new(VirtualBulbConfig::default())
    }
}

impl VirtualBulbAdapter {
    /// Build the simulated world described by `config`.
    #[must_use]
    pub fn new(config: VirtualBulbConfig) -> Self {
        let initial = config
            .adapter_states
            .last()
            .copied()
            .unwrap_or(AdapterState::Unknown);
        let (state_tx, _) = watch::channel(initial);
        let links = Links {
            connected: HashSet::new(),
            connect_outcomes: config.connect_outcomes.iter().copied().collect(),
            reconnect_outcomes: config.reconnect_outcomes.iter().copied().collect(),
            write_outcomes: config.write_outcomes.iter().copied().collect(),
        };
        Self {
            config,
            state_tx,
            links: Mutex::new(links),
            firmware: Mutex::new(Firmware::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Report a new adapter state to subscribers.
    pub fn set_adapter_state(&self, state: AdapterState) {
        self.state_tx.send_replace(state);
    }

    /// Cut the link to a peripheral, as if it went out of range.
    pub fn drop_link(&self, id: &PeripheralId) {
        lock(&self.links).connected.remove(id);
    }

    /// Whether the adapter holds a link to the peripheral.
    #[must_use]
    pub fn is_connected(&self, id: &PeripheralId) -> bool {
        lock(&self.links).connected.contains(id)
    }

    /// What the simulated bulb currently shows.
    #[must_use]
    pub fn firmware(&self) -> FirmwareState {
        lock(&self.firmware).state()
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<AdapterCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: AdapterCall) {
        lock(&self.calls).push(call);
    }

    async fn delay(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }

    fn find(&self, id: &PeripheralId) -> Result<&VirtualPeripheral, TransportError> {
        self.config
            .peripherals
            .iter()
            .find(|p| p.id == id.as_str())
            .ok_or_else(|| TransportError::UnknownPeripheral(id.clone()))
    }

    fn require_link(&self, id: &PeripheralId) -> Result<(), TransportError> {
        if self.is_connected(id) {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }

    fn link(&self, id: &PeripheralId, outcome: Outcome, timeout: Duration) -> Result<(), TransportError> {
        outcome.into_result(timeout)?;
        lock(&self.links).connected.insert(id.clone());
        Ok(())
    }
}

impl BleAdapter for VirtualBulbAdapter {
    async fn state_changes(&self) -> Result<EventStream<AdapterState>, TransportError> {
        self.record(AdapterCall::SubscribeState);
        self.delay().await;
        let replay = tokio_stream::iter(self.config.adapter_states.clone());
        let live = WatchStream::from_changes(self.state_tx.subscribe());
        Ok(Box::pin(replay.chain(live)))
    }

    async fn start_scanning(&self) -> Result<EventStream<PeripheralHandle>, TransportError> {
        self.record(AdapterCall::StartScan);
        self.delay().await;
        let advertised: Vec<_> = self
            .config
            .peripherals
            .iter()
            .map(|p| PeripheralHandle::new(p.id.as_str(), p.name.clone()))
            .collect();
        tracing::debug!(count = advertised.len(), "virtual scan started");
        Ok(Box::pin(
            tokio_stream::iter(advertised).chain(tokio_stream::pending()),
        ))
    }

    async fn stop_scanning(&self) -> Result<(), TransportError> {
        self.record(AdapterCall::StopScan);
        Ok(())
    }

    async fn reset(&self) -> Result<(), TransportError> {
        self.record(AdapterCall::Reset);
        self.delay().await;
        lock(&self.links).connected.clear();
        Ok(())
    }

    async fn connect(
        &self,
        peripheral: &PeripheralHandle,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        self.record(AdapterCall::Connect(peripheral.id.clone()));
        self.delay().await;
        self.find(&peripheral.id)?;
        let outcome = lock(&self.links)
            .connect_outcomes
            .pop_front()
            .unwrap_or(Outcome::Ok);
        self.link(&peripheral.id, outcome, timeout)
    }

    async fn reconnect(&self, peripheral: &PeripheralHandle) -> Result<(), TransportError> {
        self.record(AdapterCall::Reconnect(peripheral.id.clone()));
        self.delay().await;
        self.find(&peripheral.id)?;
        let outcome = lock(&self.links)
            .reconnect_outcomes
            .pop_front()
            .unwrap_or(Outcome::Ok);
        self.link(&peripheral.id, outcome, Duration::ZERO)
    }

    async fn discover_services(
        &self,
        peripheral: &PeripheralHandle,
    ) -> Result<Vec<ServiceHandle>, TransportError> {
        self.record(AdapterCall::DiscoverServices(peripheral.id.clone()));
        self.delay().await;
        let found = self.find(&peripheral.id)?;
        self.require_link(&peripheral.id)?;
        Ok(found
            .services
            .iter()
            .map(|s| ServiceHandle {
                uuid: s.uuid,
                primary: true,
            })
            .collect())
    }

    async fn discover_characteristics(
        &self,
        peripheral: &PeripheralHandle,
        service: &ServiceHandle,
    ) -> Result<Vec<CharacteristicHandle>, TransportError> {
        self.record(AdapterCall::DiscoverCharacteristics(service.uuid));
        self.delay().await;
        let found = self.find(&peripheral.id)?;
        self.require_link(&peripheral.id)?;
        Ok(found
            .services
            .iter()
            .find(|s| s.uuid == service.uuid)
            .map(|s| s.characteristics.clone())
            .unwrap_or_default())
    }

    async fn write(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &CharacteristicHandle,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        self.record(AdapterCall::Write(payload.to_vec()));
        self.delay().await;
        self.find(&peripheral.id)?;

        let outcome = lock(&self.links)
            .write_outcomes
            .pop_front()
            .unwrap_or(Outcome::Ok);
        if outcome == Outcome::Disconnect {
            self.drop_link(&peripheral.id);
        }
        outcome.into_result(Duration::ZERO)?;
        self.require_link(&peripheral.id)?;

        if !characteristic.can_write {
            return Err(TransportError::CharacteristicUnavailable(characteristic.uuid));
        }
        lock(&self.firmware)
            .apply(payload)
            .map_err(|err| TransportError::Adapter(Box::new(err)))?;
        tracing::debug!(peripheral = %peripheral.id, len = payload.len(), "virtual bulb accepted payload");
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use bulb_domain::command::{encode_power, init_commands};

    use super::*;

    fn bulb_handle() -> PeripheralHandle {
        PeripheralHandle::new(VIRTUAL_BULB_ID, Some("Prestigio RGB Light".to_owned()))
    }

    fn writable() -> CharacteristicHandle {
        CharacteristicHandle {
            uuid: short_uuid(0xFFE9),
            service: short_uuid(0xFFE5),
            can_write: true,
            write_without_response: false,
        }
    }

    #[tokio::test]
    async fn should_replay_configured_adapter_states() {
        let adapter = VirtualBulbAdapter::new(
            VirtualBulbConfig::default()
                .with_adapter_states(vec![AdapterState::Resetting, AdapterState::PoweredOn]),
        );
        let mut states = adapter.state_changes().await.unwrap();
        assert_eq!(states.next().await, Some(AdapterState::Resetting));
        assert_eq!(states.next().await, Some(AdapterState::PoweredOn));

        adapter.set_adapter_state(AdapterState::PoweredOff);
        assert_eq!(states.next().await, Some(AdapterState::PoweredOff));
    }

    #[tokio::test]
    async fn should_advertise_every_configured_peripheral() {
        let adapter = VirtualBulbAdapter::default();
        let peripherals: Vec<_> = adapter
            .start_scanning()
            .await
            .unwrap()
            .take(3)
            .collect()
            .await;
        assert_eq!(peripherals.len(), 3);
        assert!(peripherals[2].has_name("Prestigio RGB Light"));
        assert!(peripherals.iter().all(|p| !p.connected));
    }

    #[tokio::test]
    async fn should_reject_unknown_peripheral() {
        let adapter = VirtualBulbAdapter::default();
        let ghost = PeripheralHandle::new("00:00", None);
        let err = adapter
            .connect(&ghost, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownPeripheral(_)));
    }

    #[tokio::test]
    async fn should_follow_scripted_connect_outcomes() {
        let adapter = VirtualBulbAdapter::new(
            VirtualBulbConfig::default().with_connect_outcomes(vec![Outcome::Timeout]),
        );
        let timeout = Duration::from_secs(10);
        let err = adapter.connect(&bulb_handle(), timeout).await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectTimeout(t) if t == timeout));
        assert!(!adapter.is_connected(&bulb_handle().id));

        adapter.connect(&bulb_handle(), timeout).await.unwrap();
        assert!(adapter.is_connected(&bulb_handle().id));
    }

    #[tokio::test]
    async fn should_require_link_for_discovery() {
        let adapter = VirtualBulbAdapter::default();
        let err = adapter.discover_services(&bulb_handle()).await.unwrap_err();
        assert!(err.is_disconnect());

        adapter
            .connect(&bulb_handle(), Duration::from_secs(1))
            .await
            .unwrap();
        let services = adapter.discover_services(&bulb_handle()).await.unwrap();
        assert_eq!(services.len(), 2);
        let characteristics = adapter
            .discover_characteristics(&bulb_handle(), &services[1])
            .await
            .unwrap();
        assert_eq!(characteristics.iter().filter(|c| c.can_write).count(), 1);
    }

    #[tokio::test]
    async fn should_feed_writes_to_firmware() {
        let adapter = VirtualBulbAdapter::default();
        adapter
            .connect(&bulb_handle(), Duration::from_secs(1))
            .await
            .unwrap();
        for command in init_commands() {
            adapter
                .write(&bulb_handle(), &writable(), command.payload())
                .await
                .unwrap();
        }
        adapter
            .write(&bulb_handle(), &writable(), encode_power(true).payload())
            .await
            .unwrap();

        let firmware = adapter.firmware();
        assert_eq!(firmware.handshake, Handshake::Complete);
        assert_eq!(firmware.intensity, 0xFF);
        assert_eq!(firmware.writes, 3);
    }

    #[tokio::test]
    async fn should_drop_link_on_scripted_disconnect() {
        let adapter = VirtualBulbAdapter::new(
            VirtualBulbConfig::default().with_write_outcomes(vec![Outcome::Disconnect]),
        );
        adapter
            .connect(&bulb_handle(), Duration::from_secs(1))
            .await
            .unwrap();
        let err = adapter
            .write(&bulb_handle(), &writable(), encode_power(true).payload())
            .await
            .unwrap_err();
        assert!(err.is_disconnect());
        assert!(!adapter.is_connected(&bulb_handle().id));
        assert_eq!(adapter.firmware().writes, 0);

        adapter.reconnect(&bulb_handle()).await.unwrap();
        adapter
            .write(&bulb_handle(), &writable(), encode_power(true).payload())
            .await
            .unwrap();
        assert_eq!(adapter.firmware().writes, 1);
    }

    #[tokio::test]
    async fn should_record_calls_in_order() {
        let adapter = VirtualBulbAdapter::default();
        adapter.stop_scanning().await.unwrap();
        adapter.reset().await.unwrap();
        adapter.reconnect(&bulb_handle()).await.unwrap();
        assert_eq!(
            adapter.calls(),
            vec![
                AdapterCall::StopScan,
                AdapterCall::Reset,
                AdapterCall::Reconnect(bulb_handle().id),
            ]
        );
    }
}
