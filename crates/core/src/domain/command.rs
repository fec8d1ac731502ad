//! Runtime commands typed by the user while decks are playing
//!
//! Grammar, one command per line, case-insensitive:
//! - `<deck> <param> <value>` with deck `a`|`b` and param one of
//!   `lp`, `bp`, `hp`, `gain`, `room`, `damping`, `wet`, `dry`
//! - `status`
//! - `quit`

use crate::domain::deck::{DeckHandle, DeckStatus};
use crate::domain::dsp::{FilterKind, FrequencyUpdate};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a command line
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown deck: {0} (expected a or b)")]
    UnknownDeck(String),

    #[error("Unknown parameter: {0} (expected lp, bp, hp, gain, room, damping, wet or dry)")]
    UnknownParameter(String),

    #[error("Missing parameter for deck {0} (expected lp, bp, hp, gain, room, damping, wet or dry)")]
    MissingParameter(DeckSide),

    #[error("Missing value for {0}")]
    MissingValue(DeckParam),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unexpected input after command: {0}")]
    TrailingInput(String),
}

/// One of the two decks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckSide {
    A,
    B,
}

impl DeckSide {
    pub const ALL: [DeckSide; 2] = [DeckSide::A, DeckSide::B];

    pub fn index(self) -> usize {
        match self {
            DeckSide::A => 0,
            DeckSide::B => 1,
        }
    }
}

impl fmt::Display for DeckSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckSide::A => f.write_str("A"),
            DeckSide::B => f.write_str("B"),
        }
    }
}

impl FromStr for DeckSide {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(DeckSide::A),
            "b" => Ok(DeckSide::B),
            _ => Err(CommandError::UnknownDeck(s.to_string())),
        }
    }
}

/// A settable deck parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckParam {
    Filter(FilterKind),
    Gain,
    RoomSize,
    Damping,
    WetLevel,
    DryLevel,
}

impl fmt::Display for DeckParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckParam::Filter(kind) => write!(f, "{kind}"),
            DeckParam::Gain => f.write_str("gain"),
            DeckParam::RoomSize => f.write_str("room size"),
            DeckParam::Damping => f.write_str("damping"),
            DeckParam::WetLevel => f.write_str("wet level"),
            DeckParam::DryLevel => f.write_str("dry level"),
        }
    }
}

impl FromStr for DeckParam {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let param = match s.to_ascii_lowercase().as_str() {
            "lp" => DeckParam::Filter(FilterKind::LowPass),
            "bp" => DeckParam::Filter(FilterKind::BandPass),
            "hp" => DeckParam::Filter(FilterKind::HighPass),
            "gain" => DeckParam::Gain,
            "room" => DeckParam::RoomSize,
            "damping" => DeckParam::Damping,
            "wet" => DeckParam::WetLevel,
            "dry" => DeckParam::DryLevel,
            _ => return Err(CommandError::UnknownParameter(s.to_string())),
        };
        Ok(param)
    }
}

/// A parsed command line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeckCommand {
    Set {
        deck: DeckSide,
        param: DeckParam,
        value: f64,
    },
    Status,
    Quit,
}

/// What applying a command did
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    FrequencyChanged {
        deck: String,
        update: FrequencyUpdate,
    },
    ValueChanged {
        deck: String,
        param: DeckParam,
        value: f64,
    },
    /// The value was out of range and the previous one was kept
    ValueIgnored {
        deck: String,
        param: DeckParam,
        value: f64,
    },
    Status(DeckStatus),
    Quit,
}

impl FromStr for DeckCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let first = words.next().ok_or(CommandError::Empty)?;

        let command = match first.to_ascii_lowercase().as_str() {
            "status" => DeckCommand::Status,
            "quit" | "exit" => DeckCommand::Quit,
            "a" | "b" => {
                let deck: DeckSide = first.parse()?;
                let param: DeckParam = words
                    .next()
                    .ok_or(CommandError::MissingParameter(deck))?
                    .parse()?;
                let raw = words.next().ok_or(CommandError::MissingValue(param))?;
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| CommandError::InvalidValue(raw.to_string()))?;
                DeckCommand::Set { deck, param, value }
            }
            _ => return Err(CommandError::UnknownCommand(first.to_string())),
        };

        match words.next() {
            Some(extra) => Err(CommandError::TrailingInput(extra.to_string())),
            None => Ok(command),
        }
    }
}

impl DeckCommand {
    /// The deck this command addresses, if any
    pub fn deck(&self) -> Option<DeckSide> {
        match self {
            DeckCommand::Set { deck, .. } => Some(*deck),
            DeckCommand::Status | DeckCommand::Quit => None,
        }
    }

    /// Apply the command to a deck
    ///
    /// `Status` reports on `handle`; `Quit` does nothing and is returned as is.
    pub fn apply(&self, handle: &DeckHandle) -> CommandResult {
        let (param, value) = match *self {
            DeckCommand::Set { param, value, .. } => (param, value),
            DeckCommand::Status => return CommandResult::Status(handle.status()),
            DeckCommand::Quit => return CommandResult::Quit,
        };

        let deck = handle.name().to_string();
        let applied = match param {
            DeckParam::Filter(kind) => {
                let update = handle.request_frequency(kind, value);
                return CommandResult::FrequencyChanged { deck, update };
            }
            DeckParam::Gain => handle.set_gain(value),
            DeckParam::RoomSize => handle.set_room_size(value),
            DeckParam::Damping => handle.set_damping(value),
            DeckParam::WetLevel => handle.set_wet_level(value),
            DeckParam::DryLevel => handle.set_dry_level(value),
        };

        if applied {
            CommandResult::ValueChanged { deck, param, value }
        } else {
            CommandResult::ValueIgnored { deck, param, value }
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::FrequencyChanged { deck, update } if update.fell_back => write!(
                f,
                "deck {deck}: {} {} Hz out of range, using {} Hz",
                update.kind, update.requested, update.applied
            ),
            CommandResult::FrequencyChanged { deck, update } => {
                write!(f, "deck {deck}: {} -> {} Hz", update.kind, update.applied)
            }
            CommandResult::ValueChanged { deck, param, value } => {
                write!(f, "deck {deck}: {param} -> {value}")
            }
            CommandResult::ValueIgnored { deck, param, value } => {
                write!(f, "deck {deck}: {param} {value} out of range [0, 1], ignored")
            }
            CommandResult::Status(status) => write!(
                f,
                "deck {}: gain {:.2} | lp {} Hz | bp {} Hz | hp {} Hz | room {:.2} damping {:.2} wet {:.2} dry {:.2}",
                status.name,
                status.gain,
                status.low_pass_hz,
                status.band_pass_hz,
                status.high_pass_hz,
                status.reverb.room_size,
                status.reverb.damping,
                status.reverb.wet_level,
                status.reverb.dry_level,
            ),
            CommandResult::Quit => f.write_str("bye"),
        }
    }
}
