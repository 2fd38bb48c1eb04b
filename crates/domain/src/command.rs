//! Command codec: maps lighting intents to the bulb's 9-byte payloads.
//!
//! Every payload is exactly [`PAYLOAD_LEN`] bytes and starts with an
//! [`Opcode`]:
//!
//! | Opcode | Meaning | Layout |
//! |--------|---------|--------|
//! | `0x14` | set colour / intensity | `[0x14, R, G, B, I, 0, 0, 0, 0]` |
//! | `0x21` | handshake, step 1 | `[0x21, 0, 0, 0, 0, 0, 0, 0, 0]` |
//! | `0x15` | handshake, step 2 | `[0x15, 0, 0, 0, 0, 0, 0, 0, 0]` |
//!
//! Colour channels are mapped from `0.0..=1.0` onto `25..=255`. The firmware
//! treats an intensity of `0x25` as "off".

use crate::error::CommandError;
use crate::token::CorrelationToken;

/// Length of every command payload, in bytes.
pub const PAYLOAD_LEN: usize = 9;

const POWER_ON_LEVEL: u8 = 0xFF;
const POWER_OFF_LEVEL: u8 = 0x25;
const DEFAULT_COLOR: [u8; 3] = [0xFF, 0xAB, 0x25];
const CHANNEL_FLOOR: u8 = 25;
const CHANNEL_SPAN: f32 = 230.0;

/// First byte of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Set colour channels and intensity.
    SetColor = 0x14,
    /// First step of the post-connection handshake.
    Handshake = 0x21,
    /// Second step of the post-connection handshake.
    HandshakeConfirm = 0x15,
}

impl Opcode {
    /// Wire value of this opcode.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Parse a wire byte, returning `None` for undefined opcodes.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x14 => Some(Self::SetColor),
            0x21 => Some(Self::Handshake),
            0x15 => Some(Self::HandshakeConfirm),
            _ => None,
        }
    }
}

/// An immutable bulb command: a 9-byte payload plus an optional correlation
/// token echoed back in the send outcome.
#[derive(Debug, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    payload: [u8; PAYLOAD_LEN],
    token: Option<CorrelationToken>,
}

impl Command {
    fn new(opcode: Opcode, body: [u8; PAYLOAD_LEN - 1]) -> Self {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = opcode.byte();
        payload[1..].copy_from_slice(&body);
        Self {
            opcode,
            payload,
            token: None,
        }
    }

    /// Build a command from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::WrongLength`] when `bytes` is not exactly
    /// [`PAYLOAD_LEN`] long and [`CommandError::UnknownOpcode`] when the first
    /// byte is not a defined [`Opcode`].
    pub fn from_payload(bytes: &[u8]) -> Result<Self, CommandError> {
        let payload: [u8; PAYLOAD_LEN] =
            bytes.try_into().map_err(|_| CommandError::WrongLength {
                expected: PAYLOAD_LEN,
                actual: bytes.len(),
            })?;
        let opcode = Opcode::from_byte(payload[0]).ok_or(CommandError::UnknownOpcode(payload[0]))?;
        Ok(Self {
            opcode,
            payload,
            token: None,
        })
    }

    /// Attach a correlation token.
    #[must_use]
    pub fn with_token(mut self, token: CorrelationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// The opcode in byte 0.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// The raw bytes written to the characteristic.
    #[must_use]
    pub fn payload(&self) -> &[u8; PAYLOAD_LEN] {
        &self.payload
    }

    /// The correlation token, if the caller supplied one.
    #[must_use]
    pub fn token(&self) -> Option<CorrelationToken> {
        self.token
    }

    /// Lowercase hex rendering of the payload (e.g. `"14000000ff00000000"`).
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.payload.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

/// Full white when `on`, the firmware's off marker otherwise.
#[must_use]
pub fn encode_power(on: bool) -> Command {
    let level = if on { POWER_ON_LEVEL } else { POWER_OFF_LEVEL };
    Command::new(Opcode::SetColor, [0, 0, 0, level, 0, 0, 0, 0])
}

/// The bulb's warm default colour.
#[must_use]
pub fn encode_default_color() -> Command {
    let [r, g, b] = DEFAULT_COLOR;
    Command::new(Opcode::SetColor, [r, g, b, 0, 0, 0, 0, 0])
}

/// Set colour channels and intensity.
///
/// Absent channels are sent as `0`. Present values are mapped with
/// `round(230 * value) + 25` and are not clamped: values outside `0.0..=1.0`
/// yield bytes outside `25..=255` (saturating at the `u8` bounds).
#[must_use]
pub fn encode_color(
    red: Option<f32>,
    green: Option<f32>,
    blue: Option<f32>,
    intensity: Option<f32>,
) -> Command {
    Command::new(
        Opcode::SetColor,
        [
            channel_byte(red),
            channel_byte(green),
            channel_byte(blue),
            channel_byte(intensity),
            0,
            0,
            0,
            0,
        ],
    )
}

/// White at the given intensity, colour channels off.
#[must_use]
pub fn encode_white(intensity: f32) -> Command {
    encode_color(None, None, None, Some(intensity))
}

/// The bring-up sequence. Send in order, each after the previous one
/// succeeded.
#[must_use]
pub fn init_commands() -> [Command; 2] {
    [
        Command::new(Opcode::Handshake, [0; PAYLOAD_LEN - 1]),
        Command::new(Opcode::HandshakeConfirm, [0; PAYLOAD_LEN - 1]),
    ]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_byte(value: Option<f32>) -> u8 {
    // float -> u8 casts saturate
    value.map_or(0, |v| ((CHANNEL_SPAN * v).round() + f32::from(CHANNEL_FLOOR)) as u8)
}
