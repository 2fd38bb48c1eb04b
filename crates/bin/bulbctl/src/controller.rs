//! Reacts to session notifications and console commands.

use std::io::Write;

use bulb_app::services::{BringUp, BringUpStep, SessionClosed, SessionHandle};
use bulb_domain::session::Notification;
use bulb_domain::token::CorrelationToken;

use crate::console::{ConsoleCommand, HELP};
use crate::history::History;

/// Whether the console loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Exit.
    Quit,
}

/// Glue between the console, the session and the handshake sequencer.
pub struct Controller {
    handle: SessionHandle,
    bring_up: Option<BringUp>,
    history: History,
}

impl Controller {
    pub fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            bring_up: None,
            history: History::default(),
        }
    }

    /// Record a notification and advance the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] if a handshake command cannot be enqueued.
    pub fn on_notification(&mut self, notification: &Notification) -> Result<(), SessionClosed> {
        self.history.record(notification);

        if matches!(notification, Notification::BulbFound) {
            let mut bring_up = BringUp::new();
            if let Some(command) = bring_up.start() {
                tracing::debug!(payload = %command.to_hex(), "starting bulb handshake");
                self.handle.send(command)?;
            }
            self.bring_up = Some(bring_up);
            return Ok(());
        }

        let Some(bring_up) = self.bring_up.as_mut() else {
            return Ok(());
        };
        match bring_up.advance(notification) {
            BringUpStep::Send(command) => self.handle.send(command)?,
            BringUpStep::Complete => {
                tracing::info!("Initialized");
                self.bring_up = None;
            }
            BringUpStep::Aborted => {
                tracing::warn!("bulb handshake failed");
                self.bring_up = None;
            }
            BringUpStep::Pending => {}
        }
        Ok(())
    }

    /// Execute a console command, writing any output to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has stopped or `out` cannot be written.
    pub fn on_command(
        &mut self,
        command: ConsoleCommand,
        out: &mut impl Write,
    ) -> anyhow::Result<Flow> {
        if let Some(bulb_command) = command.to_bulb_command() {
            let token = CorrelationToken::new();
            tracing::debug!(%token, payload = %bulb_command.to_hex(), "queueing command");
            self.handle.send(bulb_command.with_token(token))?;
            writeln!(out, "queued {token}")?;
            return Ok(Flow::Continue);
        }

        match command {
            ConsoleCommand::Status => {
                let status = self.handle.current_status();
                writeln!(out, "{}: {}", status.label(), serde_json::to_string(&status)?)?;
            }
            ConsoleCommand::History => writeln!(out, "{}", self.history.to_json()?)?,
            ConsoleCommand::Help => writeln!(out, "{HELP}")?,
            ConsoleCommand::Quit => return Ok(Flow::Quit),
            _ => {}
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bulb_adapter_virtual::{Handshake, VirtualBulbAdapter};
    use bulb_app::services::{BulbSession, ChannelObserver};
    use bulb_domain::session::SessionConfig;

    use super::*;

    #[tokio::test]
    async fn should_run_handshake_after_bulb_found() {
        let adapter = Arc::new(VirtualBulbAdapter::default());
        let (observer, mut notifications) = ChannelObserver::new();
        let (session, handle) =
            BulbSession::new(Arc::clone(&adapter), observer, SessionConfig::default());
        tokio::spawn(session.run());
        handle.start().unwrap();

        let mut controller = Controller::new(handle);
        tokio::time::timeout(Duration::from_secs(5), async {
            while adapter.firmware().handshake != Handshake::Complete {
                let notification = notifications.recv().await.unwrap();
                controller.on_notification(&notification).unwrap();
            }
        })
        .await
        .unwrap();

        assert_eq!(adapter.firmware().writes, 2);
    }

    #[tokio::test]
    async fn should_print_help_and_quit() {
        let adapter = Arc::new(VirtualBulbAdapter::default());
        let (observer, _notifications) = ChannelObserver::new();
        let (_session, handle) = BulbSession::new(adapter, observer, SessionConfig::default());
        let mut controller = Controller::new(handle);

        let mut out = Vec::new();
        assert_eq!(
            controller.on_command(ConsoleCommand::Help, &mut out).unwrap(),
            Flow::Continue
        );
        assert!(String::from_utf8(out).unwrap().contains("white <i>"));
        assert_eq!(
            controller
                .on_command(ConsoleCommand::Quit, &mut Vec::new())
                .unwrap(),
            Flow::Quit
        );
    }

    #[tokio::test]
    async fn should_print_idle_status_before_start() {
        let adapter = Arc::new(VirtualBulbAdapter::default());
        let (observer, _notifications) = ChannelObserver::new();
        let (_session, handle) = BulbSession::new(adapter, observer, SessionConfig::default());
        let mut controller = Controller::new(handle);

        let mut out = Vec::new();
        controller
            .on_command(ConsoleCommand::Status, &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "idle: {\"state\":\"idle\"}\n"
        );
    }

    #[tokio::test]
    async fn should_queue_bulb_commands_with_token() {
        let adapter = Arc::new(VirtualBulbAdapter::default());
        let (observer, _notifications) = ChannelObserver::new();
        let (_session, handle) = BulbSession::new(adapter, observer, SessionConfig::default());
        let mut controller = Controller::new(handle);

        let mut out = Vec::new();
        controller.on_command(ConsoleCommand::On, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("queued "));
    }
}
