//! The fixed low-pass → band-pass → high-pass cascade

use super::{BiquadCoeffs, BiquadState, FilterKind, FilterStage, FrequencyUpdate};
use crate::domain::audio::ProcessSpec;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Coefficients of all three stages taken together for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainCoefficients(pub [BiquadCoeffs; 3]);

impl ChainCoefficients {
    /// Filter one channel in place, low-pass first, high-pass last
    #[inline]
    pub fn process_channel(&self, state: &mut ChannelState, samples: &mut [f32]) {
        let [low, band, high] = &self.0;
        let [low_state, band_state, high_state] = &mut state.0;
        for sample in samples.iter_mut() {
            let x = low_state.process(low, *sample);
            let x = band_state.process(band, x);
            *sample = high_state.process(high, x);
        }
    }
}

/// Delay lines for one channel, one per stage in cascade order
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelState(pub [BiquadState; 3]);

impl ChannelState {
    pub fn reset(&mut self) {
        for stage in &mut self.0 {
            stage.reset();
        }
    }
}

/// Three filter stages in a fixed order sharing one sample rate
///
/// Low-pass runs first so the narrower band-pass and high-pass sections see
/// a signal with its high-frequency content already removed.
///
/// The chain is shared between the control side (retuning) and the audio
/// side (reading coefficients). Control-side writers go through `update`,
/// a mutex the audio thread never touches, so a retune cannot interleave
/// with a `prepare` and publish coefficients for a stale sample rate.
#[derive(Debug)]
pub struct FilterChain {
    stages: [FilterStage; 3],
    update: Mutex<()>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self {
            stages: FilterKind::ALL.map(FilterStage::new),
            update: Mutex::new(()),
        }
    }

    fn writer(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, a panicking writer cannot leave it inconsistent
        self.update.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Prepare every stage, in cascade order
    pub fn prepare(&self, spec: &ProcessSpec) {
        let _guard = self.writer();
        for stage in &self.stages {
            stage.prepare(spec);
        }
        debug!(
            sample_rate = self.sample_rate(),
            max_block_size = spec.max_block_size,
            channels = spec.channels,
            "Filter chain prepared"
        );
    }

    /// Retune one stage; the other two are untouched
    pub fn set_frequency(&self, kind: FilterKind, frequency: f64) -> FrequencyUpdate {
        let _guard = self.writer();
        self.stages[kind.index()].set_frequency(frequency)
    }

    pub fn stage(&self, kind: FilterKind) -> &FilterStage {
        &self.stages[kind.index()]
    }

    pub fn stages(&self) -> &[FilterStage; 3] {
        &self.stages
    }

    /// Sample rate shared by the stages
    pub fn sample_rate(&self) -> f64 {
        self.stages[0].sample_rate()
    }

    pub fn is_prepared(&self) -> bool {
        self.stages.iter().all(FilterStage::is_prepared)
    }

    /// Load the current coefficients of all stages
    ///
    /// Each stage's set is read atomically. Taking this once per block keeps
    /// every sample of the block on the same coefficients.
    #[inline]
    pub fn coefficients(&self) -> ChainCoefficients {
        ChainCoefficients([
            self.stages[0].coefficients(),
            self.stages[1].coefficients(),
            self.stages[2].coefficients(),
        ])
    }

    /// Filter one channel in place with the current coefficients
    pub fn process_channel(&self, state: &mut ChannelState, samples: &mut [f32]) {
        self.coefficients().process_channel(state, samples);
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}
