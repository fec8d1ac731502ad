//! Audio buffers, processing specs and device abstractions
//!
//! This module defines the platform-agnostic audio interfaces. The CPAL
//! implementations live in the `infra` crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the audio subsystem
#[derive(Debug, Error)]
pub enum AudioError {
    /// Requested audio device was not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Error in audio stream creation or processing
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Invalid configuration for audio device
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Input/Output error at the OS level
    #[error("OS error: {0}")]
    OsError(String),

    /// Device does not support the requested configuration
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Sample rate the filters assume before the first `prepare`
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Block size used when nothing else is known
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Channel count used when nothing else is known
pub const DEFAULT_CHANNELS: usize = 2;

/// Unique identifier for an audio device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Audio sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    Hz44100,
    Hz48000,
    Hz96000,
    Hz192000,
    Custom(u32),
}

impl SampleRate {
    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
            SampleRate::Hz96000 => 96000,
            SampleRate::Hz192000 => 192000,
            SampleRate::Custom(hz) => *hz,
        }
    }

    pub fn from_hz(hz: u32) -> Self {
        match hz {
            44100 => SampleRate::Hz44100,
            48000 => SampleRate::Hz48000,
            96000 => SampleRate::Hz96000,
            192000 => SampleRate::Hz192000,
            hz => SampleRate::Custom(hz),
        }
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.hz())
    }
}

/// Stream parameters negotiated with an output device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    pub sample_rate: SampleRate,
    pub channels: u16,
    /// Frames per callback period
    pub block_size: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::Hz44100,
            channels: DEFAULT_CHANNELS as u16,
            block_size: DEFAULT_BLOCK_SIZE as u32,
        }
    }
}

/// What a processor needs to know before streaming starts
///
/// Issued once before the first block and again on every device or format
/// change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f64,
    pub max_block_size: usize,
    pub channels: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f64, max_block_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            channels,
        }
    }
}

impl Default for ProcessSpec {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_BLOCK_SIZE, DEFAULT_CHANNELS)
    }
}

impl From<&StreamSettings> for ProcessSpec {
    fn from(settings: &StreamSettings) -> Self {
        Self::new(
            settings.sample_rate.as_f64(),
            settings.block_size as usize,
            settings.channels as usize,
        )
    }
}

/// A multi-channel block of planar f32 samples handed to processors
///
/// Every channel exposes exactly `num_samples()` samples.
pub trait AudioBlock {
    fn num_channels(&self) -> usize;

    fn num_samples(&self) -> usize;

    fn channel(&self, index: usize) -> &[f32];

    fn channel_mut(&mut self, index: usize) -> &mut [f32];

    /// True when there is nothing to process
    fn is_degenerate(&self) -> bool {
        self.num_channels() == 0 || self.num_samples() == 0
    }
}

/// Owned planar audio buffer
///
/// Storage is allocated once for `capacity` frames. The active length can be
/// shrunk and grown again within that capacity without touching the
/// allocator, which is what the audio callback does when the device hands it
/// a shorter period.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl AudioBuffer {
    /// Create a zeroed buffer of `channels` x `samples`
    pub fn new(channels: usize, samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; samples]; channels],
            num_samples: samples,
        }
    }

    /// Build a buffer from per-channel sample vectors
    ///
    /// Channels are truncated to the shortest one.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        let num_samples = channels.iter().map(Vec::len).min().unwrap_or(0);
        Self {
            channels,
            num_samples,
        }
    }

    /// Frames the buffer can hold without reallocating
    pub fn capacity(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// Set the active length, clamped to the capacity
    ///
    /// Returns the length actually applied.
    pub fn set_num_samples(&mut self, samples: usize) -> usize {
        self.num_samples = samples.min(self.capacity());
        self.num_samples
    }

    /// Zero the active region of every channel
    pub fn clear(&mut self) {
        let n = self.num_samples;
        for channel in &mut self.channels {
            channel[..n].fill(0.0);
        }
    }

    /// Multiply the active region of every channel by `gain`
    pub fn apply_gain(&mut self, gain: f32) {
        let n = self.num_samples;
        for channel in &mut self.channels {
            for sample in &mut channel[..n] {
                *sample *= gain;
            }
        }
    }

    /// Sum `other` into this buffer over the shared channels and frames
    pub fn add_from(&mut self, other: &impl AudioBlock) {
        let channels = self.channels.len().min(other.num_channels());
        let n = self.num_samples.min(other.num_samples());
        for ch in 0..channels {
            let src = &other.channel(ch)[..n];
            for (dst, s) in self.channels[ch][..n].iter_mut().zip(src) {
                *dst += *s;
            }
        }
    }

    /// Load interleaved frames into the active region
    ///
    /// Returns the number of frames read.
    pub fn read_interleaved(&mut self, interleaved: &[f32]) -> usize {
        let channels = self.channels.len();
        if channels == 0 {
            return 0;
        }
        let frames = (interleaved.len() / channels).min(self.num_samples);
        for (frame, chunk) in interleaved.chunks_exact(channels).take(frames).enumerate() {
            for (ch, sample) in chunk.iter().enumerate() {
                self.channels[ch][frame] = *sample;
            }
        }
        frames
    }

    /// Write the active region out as interleaved frames
    ///
    /// Returns the number of frames written.
    pub fn write_interleaved(&self, interleaved: &mut [f32]) -> usize {
        let channels = self.channels.len();
        if channels == 0 {
            return 0;
        }
        let frames = (interleaved.len() / channels).min(self.num_samples);
        for (frame, chunk) in interleaved
            .chunks_exact_mut(channels)
            .take(frames)
            .enumerate()
        {
            for (ch, sample) in chunk.iter_mut().enumerate() {
                *sample = self.channels[ch][frame];
            }
        }
        frames
    }
}

impl AudioBlock for AudioBuffer {
    fn num_channels(&self) -> usize {
        self.channels.len()
    }

    fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index][..self.num_samples]
    }

    fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index][..self.num_samples]
    }
}

/// Type of audio device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    Input,
    Output,
    Duplex,
}

/// Information about an audio device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub device_type: DeviceType,
    pub sample_rates: Vec<SampleRate>,
    pub max_output_channels: u16,
    pub default_sample_rate: Option<SampleRate>,
}

/// Trait for platform-agnostic audio device operations
pub trait AudioDevice: Send + Sync {
    /// Get information about this device
    fn info(&self) -> &DeviceInfo;

    /// Check if the device can stream with these settings
    fn supports_settings(&self, settings: &StreamSettings) -> bool;

    /// Get the device's preferred output settings
    fn default_settings(&self) -> Result<StreamSettings>;
}

/// Trait for enumerating available audio devices
pub trait AudioEnumerator: Send + Sync {
    /// List all available audio devices
    fn devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Get all devices that can play audio
    fn output_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Get the default output device
    fn default_output_device(&self) -> Result<DeviceInfo>;

    /// Find a device by its ID
    fn device_by_id(&self, id: &DeviceId) -> Result<DeviceInfo>;
}
