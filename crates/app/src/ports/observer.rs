//! Observer port: lifecycle and send-outcome callbacks.

use bulb_domain::error::SendError;
use bulb_domain::session::Notification;
use bulb_domain::token::CorrelationToken;

/// Receives session notifications.
///
/// Callbacks run on the session task and must not block. Every method has
/// a no-op default so observers only implement what they care about.
pub trait SessionObserver: Send + Sync + 'static {
    /// The adapter became usable or unusable for scanning.
    fn did_state_change(&self, _can_scan: bool) {}

    /// A connect or reconnect succeeded.
    fn did_connect(&self) {}

    /// A connect or reconnect failed.
    fn did_not_connect(&self) {}

    /// The bulb exposes a writable characteristic; commands are accepted.
    fn did_bulb_found(&self) {}

    /// The bulb has no writable characteristic.
    fn did_bulb_not_found(&self) {}

    /// A command was written.
    fn did_send_command(&self, _token: Option<CorrelationToken>, _payload_hex: &str) {}

    /// A command could not be written.
    fn did_send_command_failed(
        &self,
        _token: Option<CorrelationToken>,
        _payload_hex: &str,
        _error: &SendError,
    ) {
    }

    /// Dispatch a notification to the matching callback.
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::StateChanged { can_scan } => self.did_state_change(can_scan),
            Notification::Connected => self.did_connect(),
            Notification::NotConnected => self.did_not_connect(),
            Notification::BulbFound => self.did_bulb_found(),
            Notification::BulbNotFound => self.did_bulb_not_found(),
            Notification::CommandSent { token, payload_hex } => {
                self.did_send_command(token, &payload_hex);
            }
            Notification::CommandFailed {
                token,
                payload_hex,
                error,
            } => self.did_send_command_failed(token, &payload_hex, &error),
        }
    }
}

impl<T: SessionObserver> SessionObserver for std::sync::Arc<T> {
    fn did_state_change(&self, can_scan: bool) {
        (**self).did_state_change(can_scan);
    }

    fn did_connect(&self) {
        (**self).did_connect();
    }

    fn did_not_connect(&self) {
        (**self).did_not_connect();
    }

    fn did_bulb_found(&self) {
        (**self).did_bulb_found();
    }

    fn did_bulb_not_found(&self) {
        (**self).did_bulb_not_found();
    }

    fn did_send_command(&self, token: Option<CorrelationToken>, payload_hex: &str) {
        (**self).did_send_command(token, payload_hex);
    }

    fn did_send_command_failed(
        &self,
        token: Option<CorrelationToken>,
        payload_hex: &str,
        error: &SendError,
    ) {
        (**self).did_send_command_failed(token, payload_hex, error);
    }

    fn notify(&self, notification: Notification) {
        (**self).notify(notification);
    }
}
