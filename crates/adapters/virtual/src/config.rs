//! Virtual adapter configuration: what the simulated world looks like.

use std::time::Duration;

use bulb_domain::error::TransportError;
use bulb_domain::peripheral::CharacteristicHandle;
use bulb_domain::session::AdapterState;
use bulb_domain::session::config::DEFAULT_TARGET_NAME;

/// Identifier of the simulated bulb.
pub const VIRTUAL_BULB_ID: &str = "C4:7C:8D:00:B0:1B";

/// 16-bit Bluetooth UUID expanded onto the base UUID.
#[must_use]
pub const fn short_uuid(short: u16) -> uuid::Uuid {
    uuid::Uuid::from_u128(((short as u128) << 96) | 0x0000_0000_0000_1000_8000_0080_5F9B_34FB)
}

/// Outcome of a scripted adapter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeds.
    Ok,
    /// The link drops.
    Disconnect,
    /// The connection attempt times out.
    Timeout,
    /// The stack reports a generic failure.
    Fail,
}

impl Outcome {
    pub(crate) fn into_result(self, timeout: Duration) -> Result<(), TransportError> {
        match self {
            Self::Ok => Ok(()),
            Self::Disconnect => Err(TransportError::Disconnected),
            Self::Timeout => Err(TransportError::ConnectTimeout(timeout)),
            Self::Fail => Err(TransportError::Adapter("simulated stack failure".into())),
        }
    }
}

/// A simulated GATT service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualService {
    /// Service UUID.
    pub uuid: uuid::Uuid,
    /// Characteristics, in discovery order.
    pub characteristics: Vec<CharacteristicHandle>,
}

impl VirtualService {
    /// A service with one characteristic per `(uuid, writable)` pair.
    #[must_use]
    pub fn new(uuid: uuid::Uuid, characteristics: &[(uuid::Uuid, bool)]) -> Self {
        Self {
            uuid,
            characteristics: characteristics
                .iter()
                .map(|&(char_uuid, can_write)| CharacteristicHandle {
                    uuid: char_uuid,
                    service: uuid,
                    can_write,
                    write_without_response: false,
                })
                .collect(),
        }
    }
}

/// A simulated advertising peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPeripheral {
    /// Platform identifier.
    pub id: String,
    /// Advertised local name.
    pub name: Option<String>,
    /// GATT services.
    pub services: Vec<VirtualService>,
}

impl VirtualPeripheral {
    /// The Prestigio bulb: a device-information service and the colour
    /// service with its writable characteristic.
    #[must_use]
    pub fn bulb() -> Self {
        Self {
            id: VIRTUAL_BULB_ID.to_owned(),
            name: Some(DEFAULT_TARGET_NAME.to_owned()),
            services: vec![
                VirtualService::new(short_uuid(0x180A), &[(short_uuid(0x2A29), false)]),
                VirtualService::new(
                    short_uuid(0xFFE5),
                    &[(short_uuid(0xFFE4), false), (short_uuid(0xFFE9), true)],
                ),
            ],
        }
    }

    /// An unrelated peripheral.
    #[must_use]
    pub fn stranger(id: &str, name: Option<&str>) -> Self {
        Self {
            id: id.to_owned(),
            name: name.map(str::to_owned),
            services: vec![VirtualService::new(
                short_uuid(0x180F),
                &[(short_uuid(0x2A19), false)],
            )],
        }
    }
}

/// Configuration for [`VirtualBulbAdapter`](crate::VirtualBulbAdapter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualBulbConfig {
    /// States reported when the session subscribes, in order.
    pub adapter_states: Vec<AdapterState>,
    /// Peripherals advertised when scanning, in order.
    pub peripherals: Vec<VirtualPeripheral>,
    /// Outcomes of successive connect calls; `Ok` once exhausted.
    pub connect_outcomes: Vec<Outcome>,
    /// Outcomes of successive reconnect calls; `Ok` once exhausted.
    pub reconnect_outcomes: Vec<Outcome>,
    /// Outcomes of successive writes; `Ok` once exhausted.
    pub write_outcomes: Vec<Outcome>,
    /// Delay applied to every operation.
    pub latency: Duration,
}

impl Default for VirtualBulbConfig {
    fn default() -> Self {
        Self {
            adapter_states: vec![AdapterState::PoweredOn],
            peripherals: vec![
                VirtualPeripheral::stranger("5A:11:0C:00:00:01", Some("Heart Rate")),
                VirtualPeripheral::stranger("5A:11:0C:00:00:02", None),
                VirtualPeripheral::bulb(),
            ],
            connect_outcomes: Vec::new(),
            reconnect_outcomes: Vec::new(),
            write_outcomes: Vec::new(),
            latency: Duration::ZERO,
        }
    }
}

impl VirtualBulbConfig {
    /// Replace the reported adapter states.
    #[must_use]
    pub fn with_adapter_states(mut self, states: Vec<AdapterState>) -> Self {
        self.adapter_states = states;
        self
    }

    /// Replace the advertised peripherals.
    #[must_use]
    pub fn with_peripherals(mut self, peripherals: Vec<VirtualPeripheral>) -> Self {
        self.peripherals = peripherals;
        self
    }

    /// Script connect outcomes.
    #[must_use]
    pub fn with_connect_outcomes(mut self, outcomes: Vec<Outcome>) -> Self {
        self.connect_outcomes = outcomes;
        self
    }

    /// Script reconnect outcomes.
    #[must_use]
    pub fn with_reconnect_outcomes(mut self, outcomes: Vec<Outcome>) -> Self {
        self.reconnect_outcomes = outcomes;
        self
    }

    /// Script write outcomes.
    #[must_use]
    pub fn with_write_outcomes(mut self, outcomes: Vec<Outcome>) -> Self {
        self.write_outcomes = outcomes;
        self
    }

    /// Delay every operation.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}
