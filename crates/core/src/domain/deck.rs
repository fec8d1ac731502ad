//! One DJ deck's audio path and its control surface
//!
//! Signal order inside a deck: gain, then the reverb stage, then the filter
//! cascade. The reverb itself is not implemented here; the caller passes it
//! in as a closure and the deck only owns its validated settings.

use crate::domain::audio::{AudioBlock, ProcessSpec};
use crate::domain::config::DeckSettings;
use crate::domain::dsp::{BlockProcessor, FilterKind, FrequencyUpdate, ParameterController};
use crossbeam::atomic::AtomicCell;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Parameters handed to the reverb stage
///
/// Every field is a normalized amount in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverbSettings {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        // Fully dry: the stage is inaudible until someone turns it up
        Self {
            room_size: 0.0,
            damping: 0.0,
            wet_level: 0.0,
            dry_level: 1.0,
        }
    }
}

fn is_unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// State shared between a deck and its handles
#[derive(Debug)]
struct DeckShared {
    gain: AtomicU32,
    reverb: AtomicCell<ReverbSettings>,
    reverb_update: Mutex<()>,
}

/// Audio-thread half of a deck
#[derive(Debug)]
pub struct Deck {
    name: String,
    processor: BlockProcessor,
    shared: Arc<DeckShared>,
}

/// Control half of a deck, cheap to clone
#[derive(Debug, Clone)]
pub struct DeckHandle {
    name: Arc<str>,
    filters: ParameterController,
    shared: Arc<DeckShared>,
}

/// Snapshot of a deck's parameters for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckStatus {
    pub name: String,
    pub gain: f32,
    pub low_pass_hz: f64,
    pub band_pass_hz: f64,
    pub high_pass_hz: f64,
    pub reverb: ReverbSettings,
}

impl Deck {
    pub const DEFAULT_GAIN: f32 = 1.0;

    /// Create a deck and the handle that controls it
    pub fn new(name: impl Into<String>) -> (Deck, DeckHandle) {
        let name = name.into();
        let processor = BlockProcessor::new();
        let shared = Arc::new(DeckShared {
            gain: AtomicU32::new(Self::DEFAULT_GAIN.to_bits()),
            reverb: AtomicCell::new(ReverbSettings::default()),
            reverb_update: Mutex::new(()),
        });

        let handle = DeckHandle {
            name: Arc::from(name.as_str()),
            filters: processor.controller(),
            shared: Arc::clone(&shared),
        };

        (
            Deck {
                name,
                processor,
                shared,
            },
            handle,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn processor(&self) -> &BlockProcessor {
        &self.processor
    }

    /// Prepare the filters for a new stream format
    ///
    /// Filters return to their default frequencies; call
    /// [`DeckHandle::apply`] afterwards to restore configured values.
    pub fn prepare(&mut self, spec: ProcessSpec) {
        debug!(deck = %self.name, "Preparing deck");
        self.processor.prepare(spec);
    }

    /// Run one block through gain, reverb and filters, in place
    pub fn process_block<B, R>(&mut self, buffer: &mut B, mut reverb: R)
    where
        B: AudioBlock + ?Sized,
        R: FnMut(&mut B, &ReverbSettings),
    {
        if !buffer.is_degenerate() {
            let gain = f32::from_bits(self.shared.gain.load(Ordering::Relaxed));
            if gain != 1.0 {
                for ch in 0..buffer.num_channels() {
                    for sample in buffer.channel_mut(ch) {
                        *sample *= gain;
                    }
                }
            }

            let settings = self.shared.reverb.load();
            reverb(buffer, &settings);
        }

        self.processor.process_block(buffer);
    }
}

impl DeckHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frequency controls of this deck's filter chain
    pub fn filters(&self) -> &ParameterController {
        &self.filters
    }

    pub fn request_frequency(&self, kind: FilterKind, frequency: f64) -> FrequencyUpdate {
        self.filters.request_frequency(kind, frequency)
    }

    /// Set the linear gain; values outside [0, 1] are ignored
    ///
    /// Returns whether the value was applied.
    pub fn set_gain(&self, gain: f64) -> bool {
        if !is_unit(gain) {
            warn!(deck = %self.name, gain, "Gain should be between 0 and 1, ignoring");
            return false;
        }
        self.shared.gain.store((gain as f32).to_bits(), Ordering::Relaxed);
        debug!(deck = %self.name, gain, "Gain changed");
        true
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.shared.gain.load(Ordering::Relaxed))
    }

    pub fn reverb_settings(&self) -> ReverbSettings {
        self.shared.reverb.load()
    }

    fn update_reverb(&self, field: &str, value: f64, apply: impl FnOnce(&mut ReverbSettings, f32)) -> bool {
        if !is_unit(value) {
            warn!(deck = %self.name, field, value, "Reverb value should be between 0 and 1, ignoring");
            return false;
        }
        let _guard = self
            .shared
            .reverb_update
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut settings = self.shared.reverb.load();
        apply(&mut settings, value as f32);
        self.shared.reverb.store(settings);
        debug!(deck = %self.name, field, value, "Reverb changed");
        true
    }

    pub fn set_room_size(&self, size: f64) -> bool {
        self.update_reverb("room_size", size, |s, v| s.room_size = v)
    }

    pub fn set_damping(&self, amount: f64) -> bool {
        self.update_reverb("damping", amount, |s, v| s.damping = v)
    }

    pub fn set_wet_level(&self, level: f64) -> bool {
        self.update_reverb("wet_level", level, |s, v| s.wet_level = v)
    }

    pub fn set_dry_level(&self, level: f64) -> bool {
        self.update_reverb("dry_level", level, |s, v| s.dry_level = v)
    }

    /// Push a whole configured state onto the deck
    pub fn apply(&self, settings: &DeckSettings) {
        self.set_gain(f64::from(settings.gain));
        self.filters.set_low_pass_frequency(settings.filters.low_pass_hz);
        self.filters.set_band_pass_frequency(settings.filters.band_pass_hz);
        self.filters.set_high_pass_frequency(settings.filters.high_pass_hz);
        self.set_room_size(f64::from(settings.reverb.room_size));
        self.set_damping(f64::from(settings.reverb.damping));
        self.set_wet_level(f64::from(settings.reverb.wet_level));
        self.set_dry_level(f64::from(settings.reverb.dry_level));
    }

    pub fn status(&self) -> DeckStatus {
        DeckStatus {
            name: self.name.to_string(),
            gain: self.gain(),
            low_pass_hz: self.filters.frequency(FilterKind::LowPass),
            band_pass_hz: self.filters.frequency(FilterKind::BandPass),
            high_pass_hz: self.filters.frequency(FilterKind::HighPass),
            reverb: self.reverb_settings(),
        }
    }
}
