//! Offline measurements of a chain's response

use super::{ChannelState, FilterChain};

/// Impulse response of a [`FilterChain`] and a few figures about it
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    pub samples: Vec<f32>,
    /// Largest absolute sample
    pub peak: f32,
    /// Sum of squared samples
    pub energy: f64,
    /// First index from which every sample stays below [`Self::SETTLE_THRESHOLD`]
    pub settling_sample: Option<usize>,
}

impl ImpulseResponse {
    pub const SETTLE_THRESHOLD: f32 = 1e-6;

    /// Run a unit impulse through `chain` with fresh delay lines
    pub fn of_chain(chain: &FilterChain, length: usize) -> Self {
        let mut samples = vec![0.0_f32; length];
        if let Some(first) = samples.first_mut() {
            *first = 1.0;
        }
        chain.process_channel(&mut ChannelState::default(), &mut samples);
        Self::from_samples(samples)
    }

    pub fn from_samples(samples: Vec<f32>) -> Self {
        let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        let energy = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        let settling_sample = match samples
            .iter()
            .rposition(|s| !(s.abs() < Self::SETTLE_THRESHOLD))
        {
            Some(last_loud) if last_loud + 1 < samples.len() => Some(last_loud + 1),
            Some(_) => None,
            None => Some(0),
        };

        Self {
            samples,
            peak,
            energy,
            settling_sample,
        }
    }

    /// Whether the response has died away within the measured length
    pub fn has_settled(&self) -> bool {
        self.settling_sample.is_some()
    }

    /// Largest absolute sample from `start` on
    pub fn tail_peak(&self, start: usize) -> f32 {
        self.samples
            .get(start..)
            .unwrap_or_default()
            .iter()
            .fold(0.0_f32, |m, s| m.max(s.abs()))
    }
}
