//! A single retunable biquad stage

use super::{BiquadCoeffs, BiquadState, FilterKind, FrequencyUpdate};
use crate::domain::audio::{ProcessSpec, DEFAULT_SAMPLE_RATE};
use crossbeam::atomic::AtomicCell;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{trace, warn};

/// Everything the audio thread needs from a stage, published as one unit
///
/// `coefficients` is always the design of `kind` at (`sample_rate`,
/// `frequency`); a reader never sees one field updated without the others.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSnapshot {
    pub sample_rate: f64,
    pub frequency: f64,
    pub coefficients: BiquadCoeffs,
}

/// One IIR filter of the chain
///
/// The coefficient set is the only state shared between threads. It lives in
/// an [`AtomicCell`], so publishing is a single store and the audio thread's
/// load never observes a half-written set. Delay lines are not stored here;
/// they belong to the block processor on the audio thread.
///
/// Writers are expected to be serialized (the owning [`FilterChain`] does
/// this); readers need no coordination.
///
/// [`FilterChain`]: super::FilterChain
#[derive(Debug)]
pub struct FilterStage {
    kind: FilterKind,
    snapshot: AtomicCell<StageSnapshot>,
    prepared: AtomicBool,
}

impl FilterStage {
    /// Create an unprepared stage
    ///
    /// Until `prepare` runs the coefficients are the identity, so anything
    /// streamed through the stage passes unchanged.
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            snapshot: AtomicCell::new(StageSnapshot {
                sample_rate: DEFAULT_SAMPLE_RATE,
                frequency: kind.default_frequency(),
                coefficients: BiquadCoeffs::identity(),
            }),
            prepared: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Adopt the sample rate of `spec` and retune to the stage's default frequency
    ///
    /// Block size and channel count do not affect the coefficients.
    pub fn prepare(&self, spec: &ProcessSpec) {
        let sample_rate = if spec.sample_rate.is_finite() && spec.sample_rate > 0.0 {
            spec.sample_rate
        } else {
            warn!(
                stage = %self.kind,
                sample_rate = spec.sample_rate,
                "Invalid sample rate, using {DEFAULT_SAMPLE_RATE} Hz"
            );
            DEFAULT_SAMPLE_RATE
        };
        self.publish(sample_rate, self.kind.default_frequency());
        self.prepared.store(true, Ordering::Release);
    }

    /// Retune the stage at its current sample rate
    ///
    /// Out-of-range requests are replaced by the stage's fallback frequency
    /// and reported with a warning; this never fails.
    pub fn set_frequency(&self, frequency: f64) -> FrequencyUpdate {
        let update = self.kind.validate(frequency);
        if update.fell_back {
            warn!(
                stage = %self.kind,
                requested = frequency,
                fallback = update.applied,
                "Invalid frequency, expected a value in (0, 20000] Hz; using fallback"
            );
        }

        let sample_rate = self.snapshot.load().sample_rate;
        self.publish(sample_rate, update.applied);
        trace!(stage = %self.kind, frequency = update.applied, "Stage retuned");
        update
    }

    fn publish(&self, sample_rate: f64, frequency: f64) {
        self.snapshot.store(StageSnapshot {
            sample_rate,
            frequency,
            coefficients: self.kind.design(sample_rate, frequency),
        });
    }

    /// Current published state
    #[inline]
    pub fn snapshot(&self) -> StageSnapshot {
        self.snapshot.load()
    }

    #[inline]
    pub fn coefficients(&self) -> BiquadCoeffs {
        self.snapshot.load().coefficients
    }

    /// Last validated frequency
    pub fn frequency(&self) -> f64 {
        self.snapshot.load().frequency
    }

    pub fn sample_rate(&self) -> f64 {
        self.snapshot.load().sample_rate
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.load(Ordering::Acquire)
    }

    /// Run one sample through the stage with the caller's delay line
    ///
    /// Loads the coefficients on every call; block-oriented callers should
    /// take a [`snapshot`](Self::snapshot) once and use [`BiquadState::process`].
    #[inline]
    pub fn process_sample(&self, state: &mut BiquadState, x: f32) -> f32 {
        state.process(&self.coefficients(), x)
    }
}
