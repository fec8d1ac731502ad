//! Test-signal sources that feed the decks
//!
//! There is no file playback; each deck is driven by one of these
//! generators so the filters can be heard and measured.

use crate::domain::audio::{AudioBlock, DEFAULT_SAMPLE_RATE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::{debug, warn};

/// Peak level of generated tones
pub const SINE_AMPLITUDE: f32 = 0.5;

/// What a [`SignalGenerator`] produces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    Sine { frequency: f64 },
    WhiteNoise { amplitude: f32 },
    /// A single full-scale sample, then silence
    Impulse,
    Silence,
}

/// Writes a mono signal to every channel of a block
///
/// Phase carries over from one block to the next, so consecutive fills form
/// one continuous signal.
#[derive(Debug)]
pub struct SignalGenerator {
    kind: SignalKind,
    sample_rate: f64,
    phase: f64,
    increment: f64,
    impulse_pending: bool,
    rng: StdRng,
}

impl SignalGenerator {
    pub fn new(kind: SignalKind) -> Self {
        Self::with_rng(kind, StdRng::from_entropy())
    }

    /// Generator with a reproducible noise sequence
    pub fn with_seed(kind: SignalKind, seed: u64) -> Self {
        Self::with_rng(kind, StdRng::seed_from_u64(seed))
    }

    fn with_rng(kind: SignalKind, rng: StdRng) -> Self {
        let mut generator = Self {
            kind,
            sample_rate: DEFAULT_SAMPLE_RATE,
            phase: 0.0,
            increment: 0.0,
            impulse_pending: true,
            rng,
        };
        generator.retune();
        generator
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Switch to another signal, restarting it
    pub fn set_kind(&mut self, kind: SignalKind) {
        self.kind = kind;
        self.reset();
        debug!(?kind, "Signal changed");
    }

    /// Adopt a new sample rate and restart the signal
    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            warn!(sample_rate, "Invalid sample rate, using {DEFAULT_SAMPLE_RATE} Hz");
            DEFAULT_SAMPLE_RATE
        };
        self.reset();
    }

    /// Rewind to the start: phase zero, impulse armed
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.impulse_pending = true;
        self.retune();
    }

    fn retune(&mut self) {
        self.increment = match self.kind {
            SignalKind::Sine { frequency } if frequency.is_finite() && frequency > 0.0 => {
                TAU * frequency / self.sample_rate
            }
            SignalKind::Sine { frequency } => {
                warn!(frequency, "Tone frequency must be positive, generating silence");
                0.0
            }
            _ => 0.0,
        };
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        match self.kind {
            SignalKind::Sine { .. } => {
                let value = self.phase.sin() as f32 * SINE_AMPLITUDE;
                self.phase = (self.phase + self.increment) % TAU;
                value
            }
            SignalKind::WhiteNoise { amplitude } => {
                let amplitude = amplitude.clamp(0.0, 1.0);
                self.rng.gen_range(-1.0_f32..=1.0) * amplitude
            }
            SignalKind::Impulse => {
                if std::mem::take(&mut self.impulse_pending) {
                    1.0
                } else {
                    0.0
                }
            }
            SignalKind::Silence => 0.0,
        }
    }

    /// Overwrite every channel of `buffer` with the next block of signal
    pub fn fill<B: AudioBlock + ?Sized>(&mut self, buffer: &mut B) {
        let channels = buffer.num_channels();
        if channels == 0 {
            return;
        }
        for i in 0..buffer.num_samples() {
            let value = self.next_sample();
            for ch in 0..channels {
                buffer.channel_mut(ch)[i] = value;
            }
        }
    }
}
