//! CPAL-based audio device implementation
//!
//! Provides a cross-platform interface to output devices using the CPAL library.

use cpal::traits::{DeviceTrait, HostTrait};
use std::fmt;
use tracing::{debug, info, warn};
use otodeck_core::domain::audio::{
    AudioDevice, AudioEnumerator, AudioError, DeviceId, DeviceInfo, DeviceType, Result,
    SampleRate, StreamSettings, DEFAULT_BLOCK_SIZE,
};

/// Rates reported for a device whose configs are given as ranges
const COMMON_RATES: [u32; 6] = [44100, 48000, 88200, 96000, 176400, 192000];

/// One supported output configuration: channels and an inclusive rate range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutputRange {
    channels: u16,
    min_rate: u32,
    max_rate: u32,
}

impl OutputRange {
    fn accepts(&self, settings: &StreamSettings) -> bool {
        let hz = settings.sample_rate.hz();
        self.channels == settings.channels && (self.min_rate..=self.max_rate).contains(&hz)
    }
}

/// CPAL-based audio device wrapper
pub struct CpalDevice {
    info: DeviceInfo,
    ranges: Vec<OutputRange>,
    cpal_device: cpal::Device,
}

impl CpalDevice {
    pub fn new(cpal_device: cpal::Device, device_type: DeviceType) -> Result<Self> {
        #[allow(deprecated)]
        let name = cpal_device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());

        let ranges: Vec<OutputRange> = cpal_device
            .supported_output_configs()
            .map(|configs| {
                configs
                    .map(|config| OutputRange {
                        channels: config.channels(),
                        min_rate: config.min_sample_rate(),
                        max_rate: config.max_sample_rate(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut sample_rates: Vec<SampleRate> = Vec::new();
        for range in &ranges {
            let in_range = COMMON_RATES
                .iter()
                .copied()
                .filter(|hz| (range.min_rate..=range.max_rate).contains(hz));
            // Odd ranges that hold no common rate still report their bounds
            let bounds = [range.min_rate, range.max_rate];
            for hz in in_range.chain(bounds) {
                if !sample_rates.iter().any(|sr| sr.hz() == hz) {
                    sample_rates.push(SampleRate::from_hz(hz));
                }
            }
        }
        sample_rates.sort_by_key(|sr| sr.hz());

        let max_output_channels = ranges.iter().map(|r| r.channels).max().unwrap_or(0);

        let default_sample_rate = cpal_device
            .default_output_config()
            .ok()
            .map(|config| SampleRate::from_hz(config.sample_rate()));

        // Device names double as IDs
        let info = DeviceInfo {
            id: DeviceId::new(name.clone()),
            name,
            device_type,
            sample_rates,
            max_output_channels,
            default_sample_rate,
        };

        debug!(device = %info.name, ranges = ranges.len(), "Created device");

        Ok(Self {
            info,
            ranges,
            cpal_device,
        })
    }

    /// The wrapped CPAL device, for building streams
    pub fn cpal_device(&self) -> &cpal::Device {
        &self.cpal_device
    }
}

impl AudioDevice for CpalDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn supports_settings(&self, settings: &StreamSettings) -> bool {
        self.ranges.iter().any(|range| range.accepts(settings))
    }

    fn default_settings(&self) -> Result<StreamSettings> {
        let cpal_config = self
            .cpal_device
            .default_output_config()
            .map_err(|e| AudioError::InvalidConfiguration(e.to_string()))?;

        let block_size = match cpal_config.buffer_size() {
            cpal::SupportedBufferSize::Range { min, max } => {
                (DEFAULT_BLOCK_SIZE as u32).clamp(*min, *max)
            }
            cpal::SupportedBufferSize::Unknown => DEFAULT_BLOCK_SIZE as u32,
        };

        Ok(StreamSettings {
            sample_rate: SampleRate::from_hz(cpal_config.sample_rate()),
            channels: cpal_config.channels(),
            block_size,
        })
    }
}

impl fmt::Debug for CpalDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpalDevice")
            .field("info", &self.info)
            .finish()
    }
}

/// CPAL-based audio enumerator
pub struct CpalEnumerator {
    host: cpal::Host,
}

impl Default for CpalEnumerator {
    fn default() -> Self {
        info!("Initializing CPAL enumerator");
        Self::new()
    }
}

impl CpalEnumerator {
    pub fn new() -> Self {
        let host = cpal::default_host();
        debug!("Using audio host: {:?}", host.id());
        Self { host }
    }

    fn determine_device_type(&self, device: &cpal::Device) -> Result<DeviceType> {
        let has_input = device
            .supported_input_configs()
            .map(|mut c| c.next().is_some())
            .unwrap_or(false);
        let has_output = device
            .supported_output_configs()
            .map(|mut c| c.next().is_some())
            .unwrap_or(false);

        match (has_input, has_output) {
            (true, true) => Ok(DeviceType::Duplex),
            (true, false) => Ok(DeviceType::Input),
            (false, true) => Ok(DeviceType::Output),
            (false, false) => Err(AudioError::UnsupportedConfiguration(
                "Device has no inputs or outputs".to_string(),
            )),
        }
    }

    /// Resolve an output device, the host default when `id` is `None`
    pub fn output_device(&self, id: Option<&DeviceId>) -> Result<CpalDevice> {
        let Some(id) = id else {
            let cpal_device = self
                .host
                .default_output_device()
                .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string()))?;
            return CpalDevice::new(cpal_device, DeviceType::Output);
        };

        #[allow(deprecated)]
        let cpal_device = self
            .host
            .output_devices()
            .map_err(|e| AudioError::OsError(e.to_string()))?
            .find(|d| d.name().ok().as_deref() == Some(id.as_str()))
            .ok_or_else(|| AudioError::DeviceNotFound(id.as_str().to_string()))?;

        CpalDevice::new(cpal_device, DeviceType::Output)
    }
}

impl AudioEnumerator for CpalEnumerator {
    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        info!("Enumerating all audio devices");
        let mut devices = Vec::new();

        let cpal_devices = self
            .host
            .devices()
            .map_err(|e| AudioError::OsError(e.to_string()))?;

        for device in cpal_devices {
            let device_type = match self.determine_device_type(&device) {
                Ok(dt) => dt,
                Err(_) => continue,
            };

            match CpalDevice::new(device, device_type) {
                Ok(cp_device) => {
                    debug!("Found device: {}", cp_device.info().name);
                    devices.push(cp_device.info().clone());
                }
                Err(e) => {
                    warn!("Skipping device due to error: {}", e);
                }
            }
        }

        info!("Found {} audio devices", devices.len());
        Ok(devices)
    }

    fn output_devices(&self) -> Result<Vec<DeviceInfo>> {
        let all_devices = self.devices()?;
        Ok(all_devices
            .into_iter()
            .filter(|d| matches!(d.device_type, DeviceType::Output | DeviceType::Duplex))
            .collect())
    }

    fn default_output_device(&self) -> Result<DeviceInfo> {
        self.output_device(None).map(|d| d.info().clone())
    }

    fn device_by_id(&self, id: &DeviceId) -> Result<DeviceInfo> {
        let devices = self.devices()?;
        devices
            .into_iter()
            .find(|d| d.id == *id)
            .ok_or_else(|| AudioError::DeviceNotFound(id.as_str().to_string()))
    }
}
