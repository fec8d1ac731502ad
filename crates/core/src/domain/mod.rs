//! Domain entities and business rules

pub mod audio;
pub mod command;
pub mod config;
pub mod deck;
pub mod dsp;
pub mod signal;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{
    AudioBlock, AudioBuffer, AudioDevice, AudioEnumerator, AudioError, DeviceId, DeviceInfo,
    DeviceType, ProcessSpec, SampleRate, StreamSettings,
};
pub use command::{CommandError, CommandResult, DeckCommand, DeckParam, DeckSide};
pub use config::{
    AppConfig, AudioConfig, ConfigError, ConfigManager, DeckSettings, FilterSettings, OtodeckConfig,
};
pub use deck::{Deck, DeckHandle, DeckStatus, ReverbSettings};
pub use dsp::*;
pub use signal::{SignalGenerator, SignalKind};
