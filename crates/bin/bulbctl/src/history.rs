//! Notification history shown by the `history` console command.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bulb_domain::session::Notification;
use bulb_domain::token::CorrelationToken;

/// Entries kept before the oldest ones are dropped.
const CAPACITY: usize = 256;

/// What happened, in a serialisable shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// Adapter availability changed.
    StateChanged {
        /// Whether scanning is possible.
        can_scan: bool,
    },
    /// Connected.
    Connected,
    /// Connection failed.
    NotConnected,
    /// Writable characteristic found.
    BulbFound,
    /// No writable characteristic.
    BulbNotFound,
    /// A command was written.
    CommandSent {
        /// Token echoed from the request.
        token: Option<CorrelationToken>,
        /// Payload as hex.
        payload: String,
    },
    /// A command could not be written.
    CommandFailed {
        /// Token echoed from the request.
        token: Option<CorrelationToken>,
        /// Payload as hex.
        payload: String,
        /// Rendered error chain.
        error: String,
    },
}

impl From<&Notification> for HistoryEvent {
    fn from(notification: &Notification) -> Self {
        match notification {
            Notification::StateChanged { can_scan } => Self::StateChanged {
                can_scan: *can_scan,
            },
            Notification::Connected => Self::Connected,
            Notification::NotConnected => Self::NotConnected,
            Notification::BulbFound => Self::BulbFound,
            Notification::BulbNotFound => Self::BulbNotFound,
            Notification::CommandSent { token, payload_hex } => Self::CommandSent {
                token: *token,
                payload: payload_hex.clone(),
            },
            Notification::CommandFailed {
                token,
                payload_hex,
                error,
            } => Self::CommandFailed {
                token: *token,
                payload: payload_hex.clone(),
                error: error_chain(error),
            },
        }
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// A timestamped history entry.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// When the notification was received.
    pub at: DateTime<Utc>,
    /// The notification.
    #[serde(flatten)]
    pub event: HistoryEvent,
}

/// Bounded log of received notifications.
#[derive(Debug, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    /// Record a notification with the current time.
    pub fn record(&mut self, notification: &Notification) {
        self.push(Utc::now(), notification.into());
    }

    fn push(&mut self, at: DateTime<Utc>, event: HistoryEvent) {
        if self.entries.len() == CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry { at, event });
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Pretty-printed JSON array of the entries.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialisation fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}
