//! Configuration management for otodeck
//!
//! This module provides:
//! - Configuration structs for the application, the audio stream and each deck
//! - TOML load/save of the whole configuration
//! - A manager for the main config file with corrupt-file recovery

use crate::domain::audio::{ProcessSpec, SampleRate, StreamSettings};
use crate::domain::deck::ReverbSettings;
use crate::domain::dsp::params;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine config directory")]
    ConfigDirUnknown,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,

    /// Version of the file layout
    pub config_version: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            config_version: 1,
        }
    }
}

/// Output stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,

    /// Frames per processing block
    pub block_size: u32,

    pub channels: u16,

    /// Output device ID (empty = use default)
    pub output_device: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let stream = StreamSettings::default();
        Self {
            sample_rate: stream.sample_rate.hz(),
            block_size: stream.block_size,
            channels: stream.channels,
            output_device: String::new(),
        }
    }
}

impl AudioConfig {
    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            sample_rate: SampleRate::from_hz(self.sample_rate),
            channels: self.channels,
            block_size: self.block_size,
        }
    }

    pub fn process_spec(&self) -> ProcessSpec {
        ProcessSpec::from(&self.stream_settings())
    }

    /// The configured device, if one was named
    pub fn output_device(&self) -> Option<&str> {
        let id = self.output_device.trim();
        (!id.is_empty()).then_some(id)
    }
}

/// Initial cutoff frequencies of a deck's filters, in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub low_pass_hz: f64,
    pub band_pass_hz: f64,
    pub high_pass_hz: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            low_pass_hz: params::LOW_PASS_DEFAULT,
            band_pass_hz: params::BAND_PASS_DEFAULT,
            high_pass_hz: params::HIGH_PASS_DEFAULT,
        }
    }
}

/// Initial state of one deck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckSettings {
    pub name: String,

    /// Linear gain in [0, 1]
    #[serde(default = "default_gain")]
    pub gain: f32,

    #[serde(default)]
    pub filters: FilterSettings,

    #[serde(default)]
    pub reverb: ReverbSettings,
}

fn default_gain() -> f32 {
    1.0
}

impl DeckSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gain: default_gain(),
            filters: FilterSettings::default(),
            reverb: ReverbSettings::default(),
        }
    }
}

/// Complete otodeck configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OtodeckConfig {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub decks: Vec<DeckSettings>,
}

impl OtodeckConfig {
    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = self.to_toml()?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Create factory default configuration: two decks, "A" and "B"
    pub fn factory_default() -> Self {
        Self {
            decks: vec![DeckSettings::new("A"), DeckSettings::new("B")],
            ..Self::default()
        }
    }

    /// Check values that would make the stream unusable
    ///
    /// Per-deck parameters are not checked here; out-of-range values are
    /// handled by the deck itself when the settings are applied.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".to_string()));
        }
        if self.audio.block_size == 0 {
            return Err(ConfigError::Invalid("block_size must be positive".to_string()));
        }
        if self.audio.channels == 0 {
            return Err(ConfigError::Invalid("channels must be positive".to_string()));
        }
        Ok(())
    }

    /// Settings of the deck with the given name, ignoring case
    pub fn deck(&self, name: &str) -> Option<&DeckSettings> {
        self.decks.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }
}

/// Manages the main configuration file at `<config dir>/otodeck/config.toml`
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.toml");
        Self {
            config_dir,
            config_path,
        }
    }

    /// Manager for an explicit file instead of the default location
    pub fn with_file(config_path: PathBuf) -> Self {
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            config_dir,
            config_path,
        }
    }

    /// Get the default config directory path
    ///
    /// Returns `~/.config/otodeck` on Linux, the platform equivalent elsewhere
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("otodeck"))
            .ok_or(ConfigError::ConfigDirUnknown)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file
    ///
    /// If the config file doesn't exist, writes and returns the factory default.
    /// If the config file is corrupt, backs it up, logs an error and returns
    /// the factory default.
    #[instrument(skip(self))]
    pub async fn load(&self) -> OtodeckConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, creating factory default"
            );

            let config = OtodeckConfig::factory_default();
            if let Err(e) = config.save_to_file(&self.config_path).await {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to save factory default config"
                );
            }

            return config;
        }

        match OtodeckConfig::load_from_file(&self.config_path).await {
            Ok(config) => {
                info!(
                    path = %self.config_path.display(),
                    decks = config.decks.len(),
                    "Configuration loaded successfully"
                );
                config
            }
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using factory default"
                );

                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                OtodeckConfig::factory_default()
            }
        }
    }

    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &OtodeckConfig) -> Result<()> {
        config.validate()?;
        fs::create_dir_all(&self.config_dir).await?;
        config.save_to_file(&self.config_path).await
    }

    /// Delete the config file
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if self.config_path.exists() {
            fs::remove_file(&self.config_path).await?;
            info!(
                path = %self.config_path.display(),
                "Configuration cleared"
            );
        }

        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}
