//! Mapping between btleplug GATT objects and session handles.

use btleplug::api::{CentralState, CharPropFlags, Characteristic, Service};

use bulb_domain::peripheral::{CharacteristicHandle, ServiceHandle};
use bulb_domain::session::AdapterState;

/// Map the stack's radio state onto the session's adapter state.
///
/// btleplug only distinguishes on, off and unknown; authorisation problems
/// surface as errors when the adapter is opened.
pub(crate) fn adapter_state(state: CentralState) -> AdapterState {
    match state {
        CentralState::PoweredOn => AdapterState::PoweredOn,
        CentralState::PoweredOff => AdapterState::PoweredOff,
        CentralState::Unknown => AdapterState::Unknown,
    }
}

pub(crate) fn service_handle(service: &Service) -> ServiceHandle {
    ServiceHandle {
        uuid: service.uuid,
        primary: service.primary,
    }
}

/// A characteristic is writable when it accepts either write flavour.
pub(crate) fn characteristic_handle(characteristic: &Characteristic) -> CharacteristicHandle {
    let with_response = characteristic.properties.contains(CharPropFlags::WRITE);
    let without_response = characteristic
        .properties
        .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE);
    CharacteristicHandle {
        uuid: characteristic.uuid,
        service: characteristic.service_uuid,
        can_write: with_response || without_response,
        write_without_response: without_response && !with_response,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    const SERVICE: uuid::Uuid = uuid::Uuid::from_u128(0x0000_FFE5_0000_1000_8000_0080_5F9B_34FB);
    const CHAR: uuid::Uuid = uuid::Uuid::from_u128(0x0000_FFE9_0000_1000_8000_0080_5F9B_34FB);

    fn characteristic(properties: CharPropFlags) -> Characteristic {
        Characteristic {
            uuid: CHAR,
            service_uuid: SERVICE,
            properties,
            descriptors: BTreeSet::new(),
        }
    }

    #[test]
    fn should_map_central_states() {
        assert_eq!(adapter_state(CentralState::PoweredOn), AdapterState::PoweredOn);
        assert_eq!(
            adapter_state(CentralState::PoweredOff),
            AdapterState::PoweredOff
        );
        assert_eq!(adapter_state(CentralState::Unknown), AdapterState::Unknown);
    }

    #[test]
    fn should_prefer_write_with_response_when_both_are_supported() {
        let handle = characteristic_handle(&characteristic(
            CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE,
        ));
        assert!(handle.can_write);
        assert!(!handle.write_without_response);
        assert_eq!(handle.uuid, CHAR);
        assert_eq!(handle.service, SERVICE);
    }

    #[test]
    fn should_use_write_without_response_when_only_option() {
        let handle =
            characteristic_handle(&characteristic(CharPropFlags::WRITE_WITHOUT_RESPONSE));
        assert!(handle.can_write);
        assert!(handle.write_without_response);
    }

    #[test]
    fn should_flag_read_only_characteristic_as_not_writable() {
        let handle = characteristic_handle(&characteristic(
            CharPropFlags::READ | CharPropFlags::NOTIFY,
        ));
        assert!(!handle.can_write);
    }

    #[test]
    fn should_map_service_handle() {
        let service = Service {
            uuid: SERVICE,
            primary: true,
            characteristics: BTreeSet::new(),
        };
        assert_eq!(
            service_handle(&service),
            ServiceHandle {
                uuid: SERVICE,
                primary: true
            }
        );
    }
}
