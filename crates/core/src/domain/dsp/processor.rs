//! Audio-thread side of the filter chain

use super::{ChannelState, FilterChain, ParameterController};
use crate::domain::audio::{AudioBlock, ProcessSpec};
use std::sync::Arc;
use tracing::{debug, info};

/// Streams multi-channel blocks through a [`FilterChain`]
///
/// Owns one [`ChannelState`] per prepared channel. The states persist across
/// blocks and are only reset by [`prepare`](Self::prepare) or
/// [`reset`](Self::reset), both of which take `&mut self` and therefore run
/// between callbacks, never inside one.
#[derive(Debug)]
pub struct BlockProcessor {
    chain: Arc<FilterChain>,
    channels: Vec<ChannelState>,
    spec: Option<ProcessSpec>,
}

impl BlockProcessor {
    pub fn new() -> Self {
        Self::with_chain(Arc::new(FilterChain::new()))
    }

    pub fn with_chain(chain: Arc<FilterChain>) -> Self {
        Self {
            chain,
            channels: Vec::new(),
            spec: None,
        }
    }

    /// Handle for retuning this processor's chain from another thread
    pub fn controller(&self) -> ParameterController {
        ParameterController::new(Arc::clone(&self.chain))
    }

    pub fn chain(&self) -> &Arc<FilterChain> {
        &self.chain
    }

    /// The spec of the last `prepare`, if any
    pub fn spec(&self) -> Option<ProcessSpec> {
        self.spec
    }

    /// Number of channels with their own delay lines
    pub fn prepared_channels(&self) -> usize {
        self.channels.len()
    }

    /// Configure for a new stream format
    ///
    /// Retunes every stage to its default at the new sample rate and
    /// allocates fresh delay lines for `spec.channels` channels. This is the
    /// only allocation the processor ever makes.
    pub fn prepare(&mut self, spec: ProcessSpec) {
        self.chain.prepare(&spec);
        self.channels.clear();
        self.channels.resize(spec.channels, ChannelState::default());
        self.spec = Some(spec);
        info!(
            sample_rate = spec.sample_rate,
            max_block_size = spec.max_block_size,
            channels = spec.channels,
            "Block processor prepared"
        );
    }

    /// Clear every delay line, keeping the coefficients
    pub fn reset(&mut self) {
        for state in &mut self.channels {
            state.reset();
        }
    }

    /// Filter every channel of `buffer` in place
    ///
    /// A buffer with no channels or no samples is left untouched. Channels
    /// beyond the prepared count pass through unchanged, as does everything
    /// before the first `prepare`.
    pub fn process_block<B: AudioBlock + ?Sized>(&mut self, buffer: &mut B) {
        if buffer.is_degenerate() {
            debug!(
                channels = buffer.num_channels(),
                samples = buffer.num_samples(),
                "Buffer has no channels or no samples, skipping"
            );
            return;
        }

        let coefficients = self.chain.coefficients();
        let channels = buffer.num_channels().min(self.channels.len());
        for (index, state) in self.channels[..channels].iter_mut().enumerate() {
            coefficients.process_channel(state, buffer.channel_mut(index));
        }
    }
}

impl Default for BlockProcessor {
    fn default() -> Self {
        Self::new()
    }
}
