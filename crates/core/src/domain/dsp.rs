//! Digital Signal Processing for the per-deck filter chain
//!
//! This module provides:
//! - Biquad coefficient design (RBJ cookbook low-pass, band-pass, high-pass)
//! - [`FilterStage`]: one filter whose coefficients can be retuned from any thread
//! - [`FilterChain`]: the fixed low-pass → band-pass → high-pass cascade
//! - [`ParameterController`]: the entry point for UI-driven frequency changes
//! - [`BlockProcessor`]: the audio-thread side that owns the delay lines
//! - [`ImpulseResponse`]: offline measurement of a tuned chain
//!
//! The audio thread never allocates, never takes a lock a control thread can
//! hold, and never logs outside the degenerate-buffer diagnostic.

mod analysis;
mod chain;
mod controller;
mod processor;
mod stage;

pub use analysis::ImpulseResponse;
pub use chain::{ChainCoefficients, ChannelState, FilterChain};
pub use controller::ParameterController;
pub use processor::BlockProcessor;
pub use stage::{FilterStage, StageSnapshot};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Parameter constraints for the filter stages
///
/// Requests outside the admissible range are never rejected; they are
/// replaced by the stage's fallback frequency.
pub mod params {
    /// Upper bound of the admissible frequency range (the lower bound is an exclusive 0 Hz)
    pub const MAX_FREQUENCY: f64 = 20000.0;

    /// Butterworth Q used by the low-pass and high-pass stages
    pub const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;
    /// Fixed band-pass Q, not user settable
    pub const BAND_PASS_Q: f64 = 0.7;

    /// Highest design frequency as a fraction of the sample rate
    pub const NYQUIST_GUARD: f64 = 0.49;
    /// Lowest design frequency as a fraction of the sample rate; below it
    /// `cos(w0)` rounds to 1 and both poles land on the unit circle
    pub const MIN_DESIGN_RATIO: f64 = 1e-6;

    /// Frequencies applied by `prepare`
    pub const LOW_PASS_DEFAULT: f64 = 20000.0;
    pub const BAND_PASS_DEFAULT: f64 = 1000.0;
    pub const HIGH_PASS_DEFAULT: f64 = 20.0;

    /// Substitutes for out-of-range requests
    pub const LOW_PASS_FALLBACK: f64 = 1000.0;
    pub const BAND_PASS_FALLBACK: f64 = 1000.0;
    pub const HIGH_PASS_FALLBACK: f64 = 500.0;
}

// ============================================================================
// FILTER KIND
// ============================================================================

/// Which response a [`FilterStage`] implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    LowPass,
    BandPass,
    HighPass,
}

impl FilterKind {
    /// Cascade order
    pub const ALL: [FilterKind; 3] = [FilterKind::LowPass, FilterKind::BandPass, FilterKind::HighPass];

    /// Position of this stage in the cascade
    pub fn index(self) -> usize {
        match self {
            FilterKind::LowPass => 0,
            FilterKind::BandPass => 1,
            FilterKind::HighPass => 2,
        }
    }

    /// Frequency the stage is tuned to by `prepare`
    pub fn default_frequency(self) -> f64 {
        match self {
            FilterKind::LowPass => params::LOW_PASS_DEFAULT,
            FilterKind::BandPass => params::BAND_PASS_DEFAULT,
            FilterKind::HighPass => params::HIGH_PASS_DEFAULT,
        }
    }

    /// Frequency substituted for an out-of-range request
    pub fn fallback_frequency(self) -> f64 {
        match self {
            FilterKind::LowPass => params::LOW_PASS_FALLBACK,
            FilterKind::BandPass => params::BAND_PASS_FALLBACK,
            FilterKind::HighPass => params::HIGH_PASS_FALLBACK,
        }
    }

    /// Quality factor used by the design
    pub fn q(self) -> f64 {
        match self {
            FilterKind::BandPass => params::BAND_PASS_Q,
            FilterKind::LowPass | FilterKind::HighPass => params::BUTTERWORTH_Q,
        }
    }

    /// Check a requested frequency against (0, 20000] Hz
    ///
    /// NaN and infinities are out of range.
    pub fn validate(self, requested: f64) -> FrequencyUpdate {
        let in_range = requested > 0.0 && requested <= params::MAX_FREQUENCY;
        FrequencyUpdate {
            kind: self,
            requested,
            applied: if in_range { requested } else { self.fallback_frequency() },
            fell_back: !in_range,
        }
    }

    /// Design coefficients for this response at `frequency`
    ///
    /// The design frequency is kept between [`params::MIN_DESIGN_RATIO`] and
    /// [`params::NYQUIST_GUARD`] of the sample rate so the poles stay strictly
    /// inside the unit circle for every valid request, however small or
    /// large the ratio to the sample rate. The stage still reports the
    /// requested frequency.
    pub fn design(self, sample_rate: f64, frequency: f64) -> BiquadCoeffs {
        let frequency = frequency
            .max(sample_rate * params::MIN_DESIGN_RATIO)
            .min(sample_rate * params::NYQUIST_GUARD);
        match self {
            FilterKind::LowPass => BiquadCoeffs::low_pass(sample_rate, frequency, self.q()),
            FilterKind::BandPass => BiquadCoeffs::band_pass(sample_rate, frequency, self.q()),
            FilterKind::HighPass => BiquadCoeffs::high_pass(sample_rate, frequency, self.q()),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterKind::LowPass => "low-pass",
            FilterKind::BandPass => "band-pass",
            FilterKind::HighPass => "high-pass",
        };
        f.write_str(name)
    }
}

/// Outcome of a frequency request
///
/// Purely informational: a request always succeeds from the caller's side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyUpdate {
    pub kind: FilterKind,
    pub requested: f64,
    pub applied: f64,
    pub fell_back: bool,
}

// ============================================================================
// BIQUAD FILTER (Low-level IIR section)
// ============================================================================

/// Biquad filter coefficients
///
/// Normalized so that a0 = 1. Kept in f64: low cutoffs at high sample rates
/// put the poles within 1e-6 of the unit circle, which f32 cannot resolve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    /// Denominator coefficients (a0 is normalized to 1.0)
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Unity gain (no filtering)
    pub const fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Second-order low-pass
    #[must_use]
    pub fn low_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(sample_rate, freq, q);
        let b1 = 1.0 - cos_w0;
        Self::normalized(b1 / 2.0, b1, b1 / 2.0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    /// Second-order high-pass
    #[must_use]
    pub fn high_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(sample_rate, freq, q);
        let b0 = (1.0 + cos_w0) / 2.0;
        Self::normalized(b0, -(1.0 + cos_w0), b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    /// Band-pass with 0 dB gain at the centre frequency
    #[must_use]
    pub fn band_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(sample_rate, freq, q);
        Self::normalized(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    fn prewarp(sample_rate: f64, freq: f64, q: f64) -> (f64, f64) {
        let w0 = 2.0 * PI * freq / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        (cos_w0, sin_w0 / (2.0 * q))
    }

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Roots of z² + a1·z + a2
    pub fn poles(&self) -> [Complex64; 2] {
        let disc = Complex64::new(self.a1 * self.a1 - 4.0 * self.a2, 0.0).sqrt();
        let minus_a1 = Complex64::new(-self.a1, 0.0);
        [(minus_a1 + disc) / 2.0, (minus_a1 - disc) / 2.0]
    }

    /// Both poles strictly inside the unit circle (stability triangle)
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Magnitude of the frequency response at `freq` Hz
    pub fn magnitude_at(&self, sample_rate: f64, freq: f64) -> f64 {
        let z1 = Complex64::from_polar(1.0, -2.0 * PI * freq / sample_rate);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        (num / den).norm()
    }
}

/// Delay line of one biquad section (Direct Form I)
///
/// Owned by whoever streams samples through the section; coefficients are
/// passed in so they can be swapped between blocks without touching history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadState {
    // Previous input samples (x[n-1], x[n-2])
    x1: f64,
    x2: f64,
    // Previous output samples (y[n-1], y[n-2])
    y1: f64,
    y2: f64,
}

impl BiquadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, coeffs: &BiquadCoeffs, x: f32) -> f32 {
        let x = f64::from(x);
        // Direct Form I: y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
        //                        - a1*y[n-1] - a2*y[n-2]
        let y = coeffs.b0 * x + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y as f32
    }

    /// Clear the history
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// TESTS
// ============================================================================
