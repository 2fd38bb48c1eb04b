//! The session transition function.
//!
//! [`transition`] is pure: it consumes the current state and one event and
//! returns the next state plus the effects the driver must execute. Events
//! that do not apply to the current state leave it untouched.

use std::collections::BTreeSet;

use crate::command::Command;
use crate::error::{SendError, SessionError, TransportError};
use crate::peripheral::{CharacteristicHandle, PeripheralHandle, ServiceHandle};

use super::config::SessionConfig;
use super::effect::{Effect, Notification};
use super::event::{AdapterState, SessionEvent};
use super::state::{ConnectAttempt, DiscoveryStage, SessionState};

/// Next state and the effects to execute.
pub type Transition = (SessionState, Vec<Effect>);

/// Apply one event to the session.
#[must_use]
pub fn transition(config: &SessionConfig, state: SessionState, event: SessionEvent) -> Transition {
    match event {
        SessionEvent::Start => on_start(state),
        SessionEvent::AdapterStateChanged(adapter) => on_adapter_state(state, adapter),
        SessionEvent::PeripheralDiscovered(peripheral) => {
            on_peripheral_discovered(config, state, peripheral)
        }
        SessionEvent::Connected => on_connected(state),
        SessionEvent::ConnectFailed(error) => on_connect_failed(state, &error),
        SessionEvent::ServicesDiscovered(services) => on_services_discovered(state, &services),
        SessionEvent::ServiceDiscoveryFailed(error) => on_service_discovery_failed(state, &error),
        SessionEvent::CharacteristicsDiscovered {
            service,
            link,
            characteristics,
        } => on_characteristics_discovered(state, &service, link, &characteristics),
        SessionEvent::CharacteristicDiscoveryFailed {
            service,
            link,
            error,
        } => on_characteristic_discovery_failed(state, &service, link, &error),
        SessionEvent::SendRequested(command) => on_send_requested(state, command),
        SessionEvent::WriteCompleted {
            command,
            link,
            result,
        } => on_write_completed(state, &command, link, result),
    }
}

fn stay(state: SessionState) -> Transition {
    (state, Vec::new())
}

fn on_start(state: SessionState) -> Transition {
    match state {
        SessionState::Idle => (
            SessionState::AdapterUnready,
            vec![Effect::SubscribeAdapterState],
        ),
        other => stay(other),
    }
}

fn on_adapter_state(state: SessionState, adapter: AdapterState) -> Transition {
    if matches!(state, SessionState::Idle | SessionState::Failed(_)) {
        return stay(state);
    }

    let scanning = matches!(state, SessionState::Scanning);
    match adapter.check() {
        Ok(()) => match state {
            SessionState::AdapterUnready => (
                SessionState::Scanning,
                vec![
                    Effect::Notify(Notification::StateChanged { can_scan: true }),
                    Effect::StartScan,
                ],
            ),
            other => stay(other),
        },
        Err(SessionError::Resetting) => {
            let mut effects = Vec::with_capacity(2);
            if scanning {
                effects.push(Effect::StopScan);
            }
            effects.push(Effect::ResetAdapter);
            (SessionState::AdapterUnready, effects)
        }
        Err(reason) => {
            let mut effects = Vec::with_capacity(2);
            if scanning {
                effects.push(Effect::StopScan);
            }
            effects.push(Effect::Notify(Notification::StateChanged {
                can_scan: false,
            }));
            (SessionState::Failed(reason), effects)
        }
    }
}

fn on_peripheral_discovered(
    config: &SessionConfig,
    state: SessionState,
    peripheral: PeripheralHandle,
) -> Transition {
    match state {
        SessionState::Scanning if peripheral.has_name(&config.target_name) => {
            let effects = vec![
                Effect::StopScan,
                Effect::Connect {
                    peripheral: peripheral.clone(),
                    timeout: config.connect_timeout(),
                },
            ];
            (
                SessionState::Connecting {
                    peripheral,
                    attempt: ConnectAttempt::Initial,
                },
                effects,
            )
        }
        other => stay(other),
    }
}

fn on_connected(state: SessionState) -> Transition {
    match state {
        SessionState::Connecting {
            mut peripheral,
            attempt,
        } => {
            peripheral.connected = true;
            match attempt {
                ConnectAttempt::Reconnect {
                    characteristic: Some(characteristic),
                } => (
                    SessionState::Ready {
                        peripheral,
                        characteristic,
                    },
                    vec![Effect::Notify(Notification::Connected)],
                ),
                ConnectAttempt::Initial
                | ConnectAttempt::Reconnect {
                    characteristic: None,
                } => {
                    let effects = vec![
                        Effect::Notify(Notification::Connected),
                        Effect::DiscoverServices {
                            peripheral: peripheral.clone(),
                        },
                    ];
                    (
                        SessionState::Discovering {
                            peripheral,
                            stage: DiscoveryStage::Services,
                        },
                        effects,
                    )
                }
            }
        }
        other => stay(other),
    }
}

fn on_connect_failed(state: SessionState, error: &TransportError) -> Transition {
    match state {
        SessionState::Connecting {
            peripheral,
            attempt: ConnectAttempt::Initial,
        } if error.is_disconnect() => reconnect(peripheral, None),
        SessionState::Connecting {
            attempt: ConnectAttempt::Initial,
            ..
        } => {
            let reason = match error {
                TransportError::UnknownPeripheral(_) => SessionError::Unlikely,
                _ => SessionError::ConnectFailed,
            };
            (
                SessionState::Failed(reason),
                vec![Effect::Notify(Notification::NotConnected)],
            )
        }
        SessionState::Connecting {
            attempt: ConnectAttempt::Reconnect { .. },
            ..
        } => (
            SessionState::Failed(SessionError::ReconnectFailed),
            vec![Effect::Notify(Notification::NotConnected)],
        ),
        other => stay(other),
    }
}

fn on_services_discovered(state: SessionState, services: &[ServiceHandle]) -> Transition {
    match state {
        SessionState::Discovering {
            peripheral,
            stage: DiscoveryStage::Services,
        } => {
            if services.is_empty() {
                return bulb_not_found();
            }
            let effects = services
                .iter()
                .map(|service| Effect::DiscoverCharacteristics {
                    peripheral: peripheral.clone(),
                    service: *service,
                })
                .collect();
            (
                SessionState::Discovering {
                    peripheral,
                    stage: DiscoveryStage::Characteristics {
                        pending: services.iter().map(|s| s.uuid).collect(),
                    },
                },
                effects,
            )
        }
        other => stay(other),
    }
}

fn on_service_discovery_failed(state: SessionState, error: &TransportError) -> Transition {
    match state {
        SessionState::Discovering {
            peripheral,
            stage: DiscoveryStage::Services,
        } if error.is_disconnect() => reconnect(peripheral, None),
        SessionState::Discovering {
            stage: DiscoveryStage::Services,
            ..
        } => bulb_not_found(),
        other => stay(other),
    }
}

fn on_characteristics_discovered(
    state: SessionState,
    service: &ServiceHandle,
    link: u32,
    characteristics: &[CharacteristicHandle],
) -> Transition {
    match state {
        SessionState::Discovering {
            peripheral,
            stage: DiscoveryStage::Characteristics { mut pending },
        } if peripheral.link == link && pending.contains(&service.uuid) => {
            pending.remove(&service.uuid);
            match characteristics.iter().find(|c| c.can_write) {
                Some(characteristic) => (
                    SessionState::Ready {
                        peripheral,
                        characteristic: *characteristic,
                    },
                    vec![Effect::Notify(Notification::BulbFound)],
                ),
                None => service_exhausted(peripheral, pending),
            }
        }
        // a result from an earlier link, or a service already answered
        other => stay(other),
    }
}

fn on_characteristic_discovery_failed(
    state: SessionState,
    service: &ServiceHandle,
    link: u32,
    error: &TransportError,
) -> Transition {
    match state {
        SessionState::Discovering {
            peripheral,
            stage: DiscoveryStage::Characteristics { mut pending },
        } if peripheral.link == link && pending.contains(&service.uuid) => {
            if error.is_disconnect() {
                return reconnect(peripheral, None);
            }
            pending.remove(&service.uuid);
            service_exhausted(peripheral, pending)
        }
        other => stay(other),
    }
}

fn on_send_requested(state: SessionState, command: Command) -> Transition {
    match state {
        SessionState::Ready {
            peripheral,
            characteristic,
        } => {
            let effects = vec![Effect::Write {
                peripheral: peripheral.clone(),
                characteristic,
                command,
            }];
            (
                SessionState::Ready {
                    peripheral,
                    characteristic,
                },
                effects,
            )
        }
        other => {
            let notification = Notification::CommandFailed {
                token: command.token(),
                payload_hex: command.to_hex(),
                error: SendError::NotReady,
            };
            (other, vec![Effect::Notify(notification)])
        }
    }
}

fn on_write_completed(
    state: SessionState,
    command: &Command,
    link: u32,
    result: Result<(), TransportError>,
) -> Transition {
    let token = command.token();
    let payload_hex = command.to_hex();

    let error = match result {
        Ok(()) => {
            return (
                state,
                vec![Effect::Notify(Notification::CommandSent {
                    token,
                    payload_hex,
                })],
            );
        }
        Err(error) => error,
    };

    let disconnected = error.is_disconnect();
    let failed = Effect::Notify(Notification::CommandFailed {
        token,
        payload_hex,
        error: SendError::Transport(error),
    });

    match state {
        SessionState::Ready {
            peripheral,
            characteristic,
        } if disconnected && peripheral.link == link => {
            let (next, mut effects) = reconnect(peripheral, Some(characteristic));
            effects.insert(0, failed);
            (next, effects)
        }
        other => (other, vec![failed]),
    }
}

fn reconnect(
    mut peripheral: PeripheralHandle,
    characteristic: Option<CharacteristicHandle>,
) -> Transition {
    peripheral.connected = false;
    peripheral.link = peripheral.link.wrapping_add(1);
    let effects = vec![Effect::Reconnect {
        peripheral: peripheral.clone(),
    }];
    (
        SessionState::Connecting {
            peripheral,
            attempt: ConnectAttempt::Reconnect { characteristic },
        },
        effects,
    )
}

fn service_exhausted(peripheral: PeripheralHandle, pending: BTreeSet<uuid::Uuid>) -> Transition {
    if pending.is_empty() {
        bulb_not_found()
    } else {
        stay(SessionState::Discovering {
            peripheral,
            stage: DiscoveryStage::Characteristics { pending },
        })
    }
}

fn bulb_not_found() -> Transition {
    (
        SessionState::Failed(SessionError::ServiceNotFound),
        vec![Effect::Notify(Notification::BulbNotFound)],
    )
}
