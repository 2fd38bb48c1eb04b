//! Console command parsing.

use bulb_domain::command::{
    Command, encode_color, encode_default_color, encode_power, encode_white,
};

/// Shown by `help` and at startup.
pub const HELP: &str = "\
commands:
  on                      full white
  off                     switch the light off
  default                 warm default colour
  white <i>               white at intensity i (0..1)
  color <r> <g> <b> [i]   colour channels (0..1), '-' leaves a channel unset
  status                  session status
  history                 notifications received so far, as JSON
  help                    this text
  quit                    exit";

/// One line typed at the console.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    /// Switch on.
    On,
    /// Switch off.
    Off,
    /// Warm default colour.
    Default,
    /// White at the given intensity.
    White(f32),
    /// Explicit channels.
    Color {
        /// Red channel.
        red: Option<f32>,
        /// Green channel.
        green: Option<f32>,
        /// Blue channel.
        blue: Option<f32>,
        /// Intensity.
        intensity: Option<f32>,
    },
    /// Print the session status.
    Status,
    /// Print the notification history.
    History,
    /// Print the help text.
    Help,
    /// Exit.
    Quit,
}

impl ConsoleCommand {
    /// Parse a console line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for unknown commands and malformed arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match name.to_ascii_lowercase().as_str() {
            "on" => no_args(Self::On, &args)?,
            "off" => no_args(Self::Off, &args)?,
            "default" => no_args(Self::Default, &args)?,
            "status" => no_args(Self::Status, &args)?,
            "history" => no_args(Self::History, &args)?,
            "help" | "?" => no_args(Self::Help, &args)?,
            "quit" | "exit" => no_args(Self::Quit, &args)?,
            "white" => match args.as_slice() {
                [intensity] => Self::White(number(intensity)?),
                [] => return Err(ParseError::MissingArgument("intensity")),
                _ => return Err(ParseError::TooManyArguments),
            },
            "color" | "colour" => match args.as_slice() {
                [red, green, blue] => Self::Color {
                    red: channel(red)?,
                    green: channel(green)?,
                    blue: channel(blue)?,
                    intensity: None,
                },
                [red, green, blue, intensity] => Self::Color {
                    red: channel(red)?,
                    green: channel(green)?,
                    blue: channel(blue)?,
                    intensity: channel(intensity)?,
                },
                [_, _, _, _, ..] => return Err(ParseError::TooManyArguments),
                _ => return Err(ParseError::MissingArgument("red, green and blue")),
            },
            other => return Err(ParseError::Unknown(other.to_owned())),
        };
        Ok(Some(command))
    }

    /// The bulb command to send, for commands that write to the bulb.
    #[must_use]
    pub fn to_bulb_command(self) -> Option<Command> {
        match self {
            Self::On => Some(encode_power(true)),
            Self::Off => Some(encode_power(false)),
            Self::Default => Some(encode_default_color()),
            Self::White(intensity) => Some(encode_white(intensity)),
            Self::Color {
                red,
                green,
                blue,
                intensity,
            } => Some(encode_color(red, green, blue, intensity)),
            Self::Status | Self::History | Self::Help | Self::Quit => None,
        }
    }
}

fn no_args(command: ConsoleCommand, args: &[&str]) -> Result<ConsoleCommand, ParseError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(ParseError::TooManyArguments)
    }
}

fn number(value: &str) -> Result<f32, ParseError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber(value.to_owned()))
}

fn channel(value: &str) -> Result<Option<f32>, ParseError> {
    if value == "-" {
        Ok(None)
    } else {
        number(value).map(Some)
    }
}

/// Why a console line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Not a known command.
    #[error("unknown command {0:?}, type 'help'")]
    Unknown(String),
    /// A required argument is missing.
    #[error("missing {0}")]
    MissingArgument(&'static str),
    /// More arguments than the command takes.
    #[error("too many arguments")]
    TooManyArguments,
    /// An argument is not a finite number.
    #[error("{0:?} is not a number")]
    InvalidNumber(String),
}
