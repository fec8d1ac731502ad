//! Control-side entry point for frequency changes

use super::{FilterChain, FilterKind, FrequencyUpdate};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Validates and applies UI frequency requests to a deck's filter chain
///
/// Cheap to clone; every clone drives the same chain. Requests are
/// fire-and-forget: out-of-range values are replaced by the stage's fallback,
/// so there is no error to return.
#[derive(Debug, Clone)]
pub struct ParameterController {
    chain: Arc<FilterChain>,
    fallbacks: Arc<AtomicU64>,
}

impl ParameterController {
    pub fn new(chain: Arc<FilterChain>) -> Self {
        Self {
            chain,
            fallbacks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Retune the stage of the given kind
    pub fn request_frequency(&self, kind: FilterKind, frequency: f64) -> FrequencyUpdate {
        let update = self.chain.set_frequency(kind, frequency);
        if update.fell_back {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        debug!(stage = %kind, requested = frequency, applied = update.applied, "Frequency request");
        update
    }

    pub fn set_low_pass_frequency(&self, frequency: f64) -> FrequencyUpdate {
        self.request_frequency(FilterKind::LowPass, frequency)
    }

    pub fn set_band_pass_frequency(&self, frequency: f64) -> FrequencyUpdate {
        self.request_frequency(FilterKind::BandPass, frequency)
    }

    pub fn set_high_pass_frequency(&self, frequency: f64) -> FrequencyUpdate {
        self.request_frequency(FilterKind::HighPass, frequency)
    }

    /// Frequency the stage is currently tuned to
    pub fn frequency(&self, kind: FilterKind) -> f64 {
        self.chain.stage(kind).frequency()
    }

    /// How many requests were replaced by a fallback since creation
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub fn chain(&self) -> &Arc<FilterChain> {
        &self.chain
    }
}
