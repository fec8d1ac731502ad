//! Real-time output stream driving a render callback
//!
//! The CPAL callback hands us interleaved f32 frames of whatever length the
//! host chooses. They are rendered in chunks of at most the configured block
//! size through a planar buffer allocated once, when the stream is opened.

use super::CpalDevice;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Stream, StreamConfig as CpalStreamConfig};
use otodeck_core::domain::audio::{
    AudioBlock, AudioBuffer, AudioDevice, AudioError, Result, StreamSettings,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Render `data` block by block through `scratch`
///
/// `scratch` must have one channel per interleaved channel; its capacity is
/// the largest chunk rendered at once. A trailing partial frame is zeroed.
pub fn render_interleaved<F>(data: &mut [f32], scratch: &mut AudioBuffer, render: &mut F)
where
    F: FnMut(&mut AudioBuffer),
{
    let channels = scratch.num_channels();
    let block = scratch.capacity();
    if channels == 0 || block == 0 {
        data.fill(0.0);
        return;
    }

    let whole = data.len() - data.len() % channels;
    let (frames, rest) = data.split_at_mut(whole);
    rest.fill(0.0);

    for chunk in frames.chunks_mut(block * channels) {
        scratch.set_num_samples(chunk.len() / channels);
        render(scratch);
        scratch.write_interleaved(chunk);
    }
}

/// A playing output stream
///
/// Playback stops when this value is dropped.
pub struct OutputStream {
    stream: Stream,
    settings: StreamSettings,
    device_name: String,
    errors: Arc<AtomicU64>,
}

impl OutputStream {
    /// Open and start an f32 output stream on `device`
    ///
    /// `render` runs on the audio thread once per chunk of at most
    /// `settings.block_size` frames and must fill the whole buffer.
    pub fn open<F>(device: &CpalDevice, settings: StreamSettings, mut render: F) -> Result<Self>
    where
        F: FnMut(&mut AudioBuffer) + Send + 'static,
    {
        let device_name = device.info().name.clone();
        info!(
            device = %device_name,
            sample_rate = settings.sample_rate.hz(),
            channels = settings.channels,
            block_size = settings.block_size,
            "Opening output stream"
        );

        if settings.channels == 0 || settings.block_size == 0 {
            return Err(AudioError::InvalidConfiguration(format!(
                "channels ({}) and block size ({}) must be positive",
                settings.channels, settings.block_size
            )));
        }
        if !device.supports_settings(&settings) {
            warn!(device = %device_name, ?settings, "Device does not advertise these settings, trying anyway");
        }

        let cpal_config = CpalStreamConfig {
            channels: settings.channels,
            sample_rate: settings.sample_rate.hz(),
            buffer_size: cpal::BufferSize::Fixed(settings.block_size),
        };

        let mut scratch = AudioBuffer::new(settings.channels as usize, settings.block_size as usize);
        let errors = Arc::new(AtomicU64::new(0));
        let error_count = Arc::clone(&errors);

        let stream = device
            .cpal_device()
            .build_output_stream(
                &cpal_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    render_interleaved(data, &mut scratch, &mut render);
                },
                move |err| {
                    error_count.fetch_add(1, Ordering::Relaxed);
                    error!("Output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(format!("Failed to start stream: {}", e)))?;

        info!(device = %device_name, "Output stream started");

        Ok(Self {
            stream,
            settings,
            device_name,
            errors,
        })
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Errors reported by the host since the stream started
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn pause(&self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamError(format!("Failed to pause stream: {}", e)))
    }

    pub fn resume(&self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| AudioError::StreamError(format!("Failed to resume stream: {}", e)))
    }
}
