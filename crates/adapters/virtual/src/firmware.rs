//! Simulated bulb firmware: interprets written payloads.

use bulb_domain::command::{Command, Opcode};
use bulb_domain::error::CommandError;

/// Intensity byte the firmware treats as "off".
const OFF_LEVEL: u8 = 0x25;

/// Progress of the post-connection handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Handshake {
    /// Nothing received yet.
    #[default]
    Pending,
    /// Step 1 (`0x21`) received.
    Started,
    /// Step 2 (`0x15`) received after step 1.
    Complete,
}

/// Snapshot of what the simulated bulb is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirmwareState {
    /// Handshake progress.
    pub handshake: Handshake,
    /// Last red, green and blue bytes.
    pub color: [u8; 3],
    /// Last intensity byte.
    pub intensity: u8,
    /// Accepted payloads.
    pub writes: usize,
}

impl FirmwareState {
    /// Whether the last command switched the light off.
    #[must_use]
    pub fn is_off(&self) -> bool {
        self.intensity == OFF_LEVEL
    }
}

/// The bulb's command interpreter.
#[derive(Debug, Default)]
pub(crate) struct Firmware {
    state: FirmwareState,
}

impl Firmware {
    /// Interpret one written payload.
    ///
    /// A confirm without a prior handshake step is accepted but leaves the
    /// handshake pending.
    pub(crate) fn apply(&mut self, payload: &[u8]) -> Result<(), CommandError> {
        let command = Command::from_payload(payload)?;
        let bytes = command.payload();
        match command.opcode() {
            Opcode::Handshake => self.state.handshake = Handshake::Started,
            Opcode::HandshakeConfirm => {
                if self.state.handshake == Handshake::Started {
                    self.state.handshake = Handshake::Complete;
                }
            }
            Opcode::SetColor => {
                self.state.color = [bytes[1], bytes[2], bytes[3]];
                self.state.intensity = bytes[4];
            }
        }
        self.state.writes += 1;
        Ok(())
    }

    pub(crate) fn state(&self) -> FirmwareState {
        self.state
    }
}
