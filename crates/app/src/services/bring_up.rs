//! Handshake sequencing after the bulb is found.
//!
//! The bulb expects [`init_commands`] in order, each written only after the
//! previous one succeeded. [`BringUp`] tags every command with a fresh
//! [`CorrelationToken`] and releases the next one when the matching
//! success notification comes back.

use std::collections::VecDeque;

use bulb_domain::command::{Command, init_commands};
use bulb_domain::session::Notification;
use bulb_domain::token::CorrelationToken;

/// What to do after feeding a notification to [`BringUp::advance`].
#[derive(Debug)]
pub enum BringUpStep {
    /// Send this command next.
    Send(Command),
    /// The whole sequence was written.
    Complete,
    /// The awaited command failed; the sequence stops.
    Aborted,
    /// The notification does not concern the sequence.
    Pending,
}

/// Sequencer for the post-connection handshake.
#[derive(Debug)]
pub struct BringUp {
    remaining: VecDeque<Command>,
    awaiting: Option<CorrelationToken>,
}

impl Default for BringUp {
    fn default() -> Self {
        Self {
            remaining: init_commands().into_iter().collect(),
            awaiting: None,
        }
    }
}

impl BringUp {
    /// A sequencer over [`init_commands`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the first command. Returns `None` once started.
    pub fn start(&mut self) -> Option<Command> {
        if self.awaiting.is_some() {
            return None;
        }
        self.release()
    }

    /// Feed a send outcome to the sequencer.
    pub fn advance(&mut self, notification: &Notification) -> BringUpStep {
        let Some(awaiting) = self.awaiting else {
            return BringUpStep::Pending;
        };
        match notification {
            Notification::CommandSent { token, .. } if *token == Some(awaiting) => {
                self.awaiting = None;
                match self.release() {
                    Some(command) => BringUpStep::Send(command),
                    None => BringUpStep::Complete,
                }
            }
            Notification::CommandFailed { token, .. } if *token == Some(awaiting) => {
                self.awaiting = None;
                self.remaining.clear();
                BringUpStep::Aborted
            }
            _ => BringUpStep::Pending,
        }
    }

    /// Whether a command is still awaiting its outcome.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.awaiting.is_some()
    }

    fn release(&mut self) -> Option<Command> {
        let token = CorrelationToken::new();
        let command = self.remaining.pop_front()?.with_token(token);
        self.awaiting = Some(token);
        Some(command)
    }
}
