//! Session driver: runs the bulb state machine against a [`BleAdapter`].
//!
//! [`BulbSession::run`] owns the [`SessionState`] and is the only place it
//! changes. Caller requests arrive through a [`SessionHandle`]; adapter
//! operations run on a [`JoinSet`] and report their outcome back through an
//! internal channel, so every transition happens sequentially on the
//! session task.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinSet};
use tokio_stream::StreamExt as _;

use bulb_domain::command::Command;
use bulb_domain::session::{
    AdapterState, Effect, Notification, SessionConfig, SessionEvent, SessionState, SessionStatus,
    transition,
};

use crate::ports::{BleAdapter, SessionObserver};

/// The session task has stopped and no longer accepts requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("bulb session has stopped")]
pub struct SessionClosed;

#[derive(Debug)]
enum Request {
    Start,
    Send(Command),
}

/// Cloneable front door to a running [`BulbSession`].
///
/// Requests are enqueued and return immediately; outcomes arrive through the
/// session's observer. Dropping every handle stops the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    requests: mpsc::UnboundedSender<Request>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    /// Ask the session to subscribe to the adapter and start looking for the
    /// bulb. Ignored once started.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has stopped.
    pub fn start(&self) -> Result<(), SessionClosed> {
        self.requests.send(Request::Start).map_err(|_| SessionClosed)
    }

    /// Enqueue a command for writing.
    ///
    /// The outcome is reported to the observer as sent or failed, carrying
    /// the command's token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session task has stopped.
    pub fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.requests
            .send(Request::Send(command))
            .map_err(|_| SessionClosed)
    }

    /// Watch the session status.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// The latest session status.
    #[must_use]
    pub fn current_status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }
}

/// A single bulb session.
pub struct BulbSession<A, O> {
    adapter: Arc<A>,
    observer: O,
    config: SessionConfig,
    state: SessionState,
    requests: mpsc::UnboundedReceiver<Request>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    status: watch::Sender<SessionStatus>,
    tasks: JoinSet<()>,
    scan: Option<AbortHandle>,
}

impl<A, O> BulbSession<A, O>
where
    A: BleAdapter,
    O: SessionObserver,
{
    /// Create a session and its handle. Nothing happens until
    /// [`run`](Self::run) is polled and [`SessionHandle::start`] is called.
    pub fn new(adapter: Arc<A>, observer: O, config: SessionConfig) -> (Self, SessionHandle) {
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(SessionStatus::Idle);

        let session = Self {
            adapter,
            observer,
            config,
            state: SessionState::Idle,
            requests,
            events_tx,
            events_rx,
            status,
            tasks: JoinSet::new(),
            scan: None,
        };
        let handle = SessionHandle {
            requests: requests_tx,
            status: status_rx,
        };
        (session, handle)
    }

    /// Drive the session until every [`SessionHandle`] is dropped.
    ///
    /// Outstanding adapter operations and subscriptions are aborted on
    /// return.
    pub async fn run(mut self) {
        tracing::debug!(target_name = %self.config.target_name, "bulb session running");
        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Start) => self.apply(SessionEvent::Start),
                    Some(Request::Send(command)) => self.apply(SessionEvent::SendRequested(command)),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.apply(event),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(err) = joined
                        && err.is_panic()
                    {
                        tracing::error!(%err, "adapter task panicked");
                    }
                }
            }
        }
        self.tasks.shutdown().await;
        tracing::debug!("bulb session stopped");
    }

    fn apply(&mut self, event: SessionEvent) {
        let previous = std::mem::take(&mut self.state);
        let from = previous.status().label();
        let (next, effects) = transition(&self.config, previous, event);
        self.state = next;

        let status = self.state.status();
        if status.label() != from {
            tracing::info!(from, to = status.label(), "session state changed");
        }
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });

        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::SubscribeAdapterState => self.subscribe_adapter_state(),
            Effect::StartScan => self.start_scan(),
            Effect::StopScan => {
                self.abort_scan();
                let adapter = Arc::clone(&self.adapter);
                self.tasks.spawn(async move {
                    if let Err(err) = adapter.stop_scanning().await {
                        tracing::warn!(%err, "failed to stop scanning");
                    }
                });
            }
            Effect::ResetAdapter => {
                self.abort_scan();
                let adapter = Arc::clone(&self.adapter);
                self.tasks.spawn(async move {
                    tracing::info!("resetting bluetooth adapter");
                    if let Err(err) = adapter.reset().await {
                        tracing::warn!(%err, "failed to reset adapter");
                    }
                });
            }
            Effect::Connect {
                peripheral,
                timeout,
            } => self.spawn_reporting(move |adapter| async move {
                tracing::info!(peripheral = %peripheral.id, ?timeout, "connecting to bulb");
                match adapter.connect(&peripheral, timeout).await {
                    Ok(()) => SessionEvent::Connected,
                    Err(err) => SessionEvent::ConnectFailed(err),
                }
            }),
            Effect::Reconnect { peripheral } => self.spawn_reporting(move |adapter| async move {
                tracing::info!(peripheral = %peripheral.id, "reconnecting to bulb");
                match adapter.reconnect(&peripheral).await {
                    Ok(()) => SessionEvent::Connected,
                    Err(err) => SessionEvent::ConnectFailed(err),
                }
            }),
            Effect::DiscoverServices { peripheral } => {
                self.spawn_reporting(move |adapter| async move {
                    match adapter.discover_services(&peripheral).await {
                        Ok(services) => {
                            tracing::debug!(
                                peripheral = %peripheral.id,
                                count = services.len(),
                                "services discovered"
                            );
                            SessionEvent::ServicesDiscovered(services)
                        }
                        Err(err) => SessionEvent::ServiceDiscoveryFailed(err),
                    }
                });
            }
            Effect::DiscoverCharacteristics {
                peripheral,
                service,
            } => self.spawn_reporting(move |adapter| async move {
                let link = peripheral.link;
                match adapter.discover_characteristics(&peripheral, &service).await {
                    Ok(characteristics) => SessionEvent::CharacteristicsDiscovered {
                        service,
                        link,
                        characteristics,
                    },
                    Err(error) => SessionEvent::CharacteristicDiscoveryFailed {
                        service,
                        link,
                        error,
                    },
                }
            }),
            Effect::Write {
                peripheral,
                characteristic,
                command,
            } => self.spawn_reporting(move |adapter| async move {
                tracing::debug!(payload = %command.to_hex(), "writing command");
                let result = adapter
                    .write(&peripheral, &characteristic, command.payload())
                    .await;
                SessionEvent::WriteCompleted {
                    command,
                    link: peripheral.link,
                    result,
                }
            }),
            Effect::Notify(notification) => self.notify(notification),
        }
    }

    /// Run an adapter operation on the task set and feed its outcome back
    /// into the session.
    fn spawn_reporting<F, Fut>(&mut self, operation: F)
    where
        F: FnOnce(Arc<A>) -> Fut,
        Fut: Future<Output = SessionEvent> + Send + 'static,
    {
        let future = operation(Arc::clone(&self.adapter));
        let events = self.events_tx.clone();
        self.tasks.spawn(async move {
            // the session only drops its receiver when shutting down
            let _ = events.send(future.await);
        });
    }

    fn subscribe_adapter_state(&mut self) {
        let adapter = Arc::clone(&self.adapter);
        let events = self.events_tx.clone();
        self.tasks.spawn(async move {
            let mut states = match adapter.state_changes().await {
                Ok(states) => states,
                Err(err) => {
                    tracing::warn!(%err, "failed to subscribe to adapter state");
                    let _ = events.send(SessionEvent::AdapterStateChanged(AdapterState::Unknown));
                    return;
                }
            };
            while let Some(state) = states.next().await {
                tracing::debug!(?state, "adapter state update");
                if events.send(SessionEvent::AdapterStateChanged(state)).is_err() {
                    break;
                }
            }
        });
    }

    fn start_scan(&mut self) {
        self.abort_scan();
        let adapter = Arc::clone(&self.adapter);
        let events = self.events_tx.clone();
        let handle = self.tasks.spawn(async move {
            let mut peripherals = match adapter.start_scanning().await {
                Ok(peripherals) => peripherals,
                Err(err) => {
                    tracing::warn!(%err, "failed to start scanning");
                    let _ = events.send(SessionEvent::AdapterStateChanged(AdapterState::Unknown));
                    return;
                }
            };
            tracing::info!("scanning for bulb");
            while let Some(peripheral) = peripherals.next().await {
                tracing::trace!(peripheral = %peripheral.id, name = ?peripheral.name, "peripheral discovered");
                if events
                    .send(SessionEvent::PeripheralDiscovered(peripheral))
                    .is_err()
                {
                    break;
                }
            }
        });
        self.scan = Some(handle);
    }

    fn abort_scan(&mut self) {
        if let Some(scan) = self.scan.take() {
            scan.abort();
        }
    }

    fn notify(&self, notification: Notification) {
        match &notification {
            Notification::StateChanged { can_scan } => {
                tracing::info!(can_scan, "adapter availability changed");
            }
            Notification::Connected => tracing::info!("bulb connected"),
            Notification::NotConnected => tracing::warn!("bulb connection failed"),
            Notification::BulbFound => tracing::info!("bulb found"),
            Notification::BulbNotFound => tracing::warn!("bulb has no writable characteristic"),
            Notification::CommandSent { payload_hex, .. } => {
                tracing::debug!(payload = %payload_hex, "command sent");
            }
            Notification::CommandFailed {
                payload_hex, error, ..
            } => tracing::warn!(payload = %payload_hex, %error, "command failed"),
        }
        self.observer.notify(notification);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use bulb_domain::command::{encode_power, init_commands};
    use bulb_domain::error::{SendError, SessionError, TransportError};
    use bulb_domain::peripheral::{CharacteristicHandle, PeripheralHandle, ServiceHandle};
    use bulb_domain::token::CorrelationToken;

    use super::*;
    use crate::ports::EventStream;
    use crate::services::ChannelObserver;

    const BULB_NAME: &str = "Prestigio RGB Light";

    /// Adapter that replays fixed answers and records writes.
    struct ScriptedAdapter {
        states: Vec<AdapterState>,
        peripherals: Vec<PeripheralHandle>,
        services: Vec<ServiceHandle>,
        characteristics: Vec<CharacteristicHandle>,
        write_results: Mutex<VecDeque<Result<(), TransportError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedAdapter {
        fn powered_on() -> Self {
            Self {
                states: vec![AdapterState::PoweredOn],
                peripherals: vec![
                    PeripheralHandle::new("11:11", Some("Speaker".to_owned())),
                    PeripheralHandle::new("22:22", Some(BULB_NAME.to_owned())),
                ],
                services: vec![ServiceHandle {
                    uuid: uuid::Uuid::from_u128(0xFFE5),
                    primary: true,
                }],
                characteristics: vec![CharacteristicHandle {
                    uuid: uuid::Uuid::from_u128(0xFFE9),
                    service: uuid::Uuid::from_u128(0xFFE5),
                    can_write: true,
                    write_without_response: false,
                }],
                write_results: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl BleAdapter for ScriptedAdapter {
        async fn state_changes(&self) -> Result<EventStream<AdapterState>, TransportError> {
            self.record("state_changes");
            let states = self.states.clone();
            Ok(Box::pin(
                tokio_stream::iter(states).chain(tokio_stream::pending()),
            ))
        }

        async fn start_scanning(&self) -> Result<EventStream<PeripheralHandle>, TransportError> {
            self.record("start_scanning");
            let peripherals = self.peripherals.clone();
            Ok(Box::pin(
                tokio_stream::iter(peripherals).chain(tokio_stream::pending()),
            ))
        }

        async fn stop_scanning(&self) -> Result<(), TransportError> {
            self.record("stop_scanning");
            Ok(())
        }

        async fn connect(
            &self,
            peripheral: &PeripheralHandle,
            _timeout: Duration,
        ) -> Result<(), TransportError> {
            self.record(format!("connect:{}", peripheral.id));
            Ok(())
        }

        async fn reconnect(&self, peripheral: &PeripheralHandle) -> Result<(), TransportError> {
            self.record(format!("reconnect:{}", peripheral.id));
            Ok(())
        }

        async fn discover_services(
            &self,
            _peripheral: &PeripheralHandle,
        ) -> Result<Vec<ServiceHandle>, TransportError> {
            self.record("discover_services");
            Ok(self.services.clone())
        }

        async fn discover_characteristics(
            &self,
            _peripheral: &PeripheralHandle,
            _service: &ServiceHandle,
        ) -> Result<Vec<CharacteristicHandle>, TransportError> {
            self.record("discover_characteristics");
            Ok(self.characteristics.clone())
        }

        async fn write(
            &self,
            _peripheral: &PeripheralHandle,
            _characteristic: &CharacteristicHandle,
            payload: &[u8],
        ) -> Result<(), TransportError> {
            self.record(format!("write:{:02x}", payload[0]));
            self.write_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }

    fn spawn_session(
        adapter: ScriptedAdapter,
    ) -> (
        Arc<ScriptedAdapter>,
        SessionHandle,
        mpsc::UnboundedReceiver<Notification>,
    ) {
        let adapter = Arc::new(adapter);
        let (observer, notifications) = ChannelObserver::new();
        let (session, handle) =
            BulbSession::new(Arc::clone(&adapter), observer, SessionConfig::default());
        tokio::spawn(session.run());
        (adapter, handle, notifications)
    }

    async fn wait_for_bulb(notifications: &mut mpsc::UnboundedReceiver<Notification>) {
        while let Some(notification) = notifications.recv().await {
            if matches!(notification, Notification::BulbFound) {
                return;
            }
        }
        panic!("session stopped before the bulb was found");
    }

    async fn next_outcome(notifications: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
        while let Some(notification) = notifications.recv().await {
            if matches!(
                notification,
                Notification::CommandSent { .. } | Notification::CommandFailed { .. }
            ) {
                return notification;
            }
        }
        panic!("session stopped before the command outcome");
    }

    #[tokio::test]
    async fn should_reach_ready_and_publish_status() {
        let (adapter, handle, mut notifications) = spawn_session(ScriptedAdapter::powered_on());
        let mut status = handle.status();
        handle.start().unwrap();

        wait_for_bulb(&mut notifications).await;
        status
            .wait_for(|s| matches!(s, SessionStatus::Ready { .. }))
            .await
            .unwrap();

        let calls = adapter.calls();
        assert_eq!(calls[0], "state_changes");
        assert!(calls.contains(&"connect:22:22".to_owned()));
        assert!(!calls.iter().any(|c| c == "connect:11:11"));
    }

    #[tokio::test]
    async fn should_report_sent_with_token_for_each_init_command() {
        let (adapter, handle, mut notifications) = spawn_session(ScriptedAdapter::powered_on());
        handle.start().unwrap();
        wait_for_bulb(&mut notifications).await;

        for command in init_commands() {
            let token = CorrelationToken::new();
            handle.send(command.with_token(token)).unwrap();
            match next_outcome(&mut notifications).await {
                Notification::CommandSent {
                    token: Some(echoed),
                    ..
                } => assert_eq!(echoed, token),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        let writes: Vec<_> = adapter
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("write:"))
            .collect();
        assert_eq!(writes, vec!["write:21", "write:15"]);
    }

    #[tokio::test]
    async fn should_fail_send_before_start() {
        let (adapter, handle, mut notifications) = spawn_session(ScriptedAdapter::powered_on());
        let token = CorrelationToken::new();
        handle.send(encode_power(true).with_token(token)).unwrap();

        match next_outcome(&mut notifications).await {
            Notification::CommandFailed {
                token: Some(echoed),
                error: SendError::NotReady,
                ..
            } => assert_eq!(echoed, token),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn should_fail_without_scanning_when_powered_off() {
        let adapter = ScriptedAdapter {
            states: vec![AdapterState::PoweredOff],
            ..ScriptedAdapter::powered_on()
        };
        let (adapter, handle, mut notifications) = spawn_session(adapter);
        let mut status = handle.status();
        handle.start().unwrap();

        assert!(matches!(
            notifications.recv().await,
            Some(Notification::StateChanged { can_scan: false })
        ));
        status
            .wait_for(|s| {
                *s == SessionStatus::Failed {
                    reason: SessionError::PoweredOff,
                }
            })
            .await
            .unwrap();
        assert_eq!(adapter.calls(), vec!["state_changes"]);
    }

    #[tokio::test]
    async fn should_reconnect_once_when_write_reports_disconnect() {
        let adapter = ScriptedAdapter::powered_on();
        adapter
            .write_results
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Disconnected));
        let (adapter, handle, mut notifications) = spawn_session(adapter);
        handle.start().unwrap();
        wait_for_bulb(&mut notifications).await;

        handle.send(encode_power(true)).unwrap();
        assert!(matches!(
            next_outcome(&mut notifications).await,
            Notification::CommandFailed {
                error: SendError::Transport(TransportError::Disconnected),
                ..
            }
        ));
        assert!(matches!(
            notifications.recv().await,
            Some(Notification::Connected)
        ));

        handle.send(encode_power(false)).unwrap();
        assert!(matches!(
            next_outcome(&mut notifications).await,
            Notification::CommandSent { .. }
        ));

        let calls = adapter.calls();
        let reconnects: Vec<_> = calls.iter().filter(|c| c.starts_with("reconnect:")).collect();
        assert_eq!(reconnects, vec!["reconnect:22:22"]);
        let discoveries = calls.iter().filter(|c| *c == "discover_services").count();
        assert_eq!(discoveries, 1);
    }

    #[tokio::test]
    async fn should_stop_when_every_handle_is_dropped() {
        let adapter = Arc::new(ScriptedAdapter::powered_on());
        let (observer, _notifications) = ChannelObserver::new();
        let (session, handle) = BulbSession::new(adapter, observer, SessionConfig::default());
        let task = tokio::spawn(session.run());
        handle.start().unwrap();
        let other = handle.clone();
        drop(handle);
        drop(other);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn should_reject_requests_after_session_stopped() {
        let adapter = Arc::new(ScriptedAdapter::powered_on());
        let (observer, _notifications) = ChannelObserver::new();
        let (session, handle) = BulbSession::new(adapter, observer, SessionConfig::default());
        drop(session);
        assert_eq!(handle.start(), Err(SessionClosed));
        assert_eq!(handle.send(encode_power(true)), Err(SessionClosed));
    }
}
