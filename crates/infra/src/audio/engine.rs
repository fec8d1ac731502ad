//! Two-deck render engine run from the audio callback
//!
//! Each deck is fed by its own signal generator, processed into a scratch
//! buffer, and summed into the output. All buffers are sized in `prepare`.

use otodeck_core::domain::audio::{AudioBlock, AudioBuffer, ProcessSpec};
use otodeck_core::domain::{
    Deck, DeckHandle, DeckSide, ReverbSettings, SignalGenerator, SignalKind,
};
use tracing::{debug, info};

/// Reverb stage used until a real one is plugged in: passes audio through
fn dry_reverb(_: &mut AudioBuffer, _: &ReverbSettings) {}

/// Mixes decks A and B into one output
#[derive(Debug)]
pub struct DeckEngine {
    decks: [Deck; 2],
    sources: [SignalGenerator; 2],
    scratch: AudioBuffer,
    spec: ProcessSpec,
}

impl DeckEngine {
    /// Create both decks and return the handles controlling them, A first
    pub fn new(sources: [SignalKind; 2]) -> (Self, [DeckHandle; 2]) {
        let (deck_a, handle_a) = Deck::new(DeckSide::A.to_string());
        let (deck_b, handle_b) = Deck::new(DeckSide::B.to_string());
        let spec = ProcessSpec::default();

        let engine = Self {
            decks: [deck_a, deck_b],
            sources: sources.map(SignalGenerator::new),
            scratch: AudioBuffer::new(spec.channels, spec.max_block_size),
            spec,
        };
        (engine, [handle_a, handle_b])
    }

    /// Size the scratch buffer and prepare decks and sources
    ///
    /// Deck filters return to their defaults; re-apply configured settings
    /// through the handles afterwards.
    pub fn prepare(&mut self, spec: ProcessSpec) {
        self.scratch = AudioBuffer::new(spec.channels, spec.max_block_size);
        for deck in &mut self.decks {
            deck.prepare(spec);
        }
        for source in &mut self.sources {
            source.prepare(spec.sample_rate);
        }
        self.spec = spec;
        info!(
            sample_rate = spec.sample_rate,
            block_size = spec.max_block_size,
            channels = spec.channels,
            "Deck engine prepared"
        );
    }

    pub fn spec(&self) -> ProcessSpec {
        self.spec
    }

    pub fn deck(&self, side: DeckSide) -> &Deck {
        &self.decks[side.index()]
    }

    /// Replace the signal feeding a deck
    pub fn set_source(&mut self, side: DeckSide, kind: SignalKind) {
        debug!(deck = %side, ?kind, "Deck source changed");
        self.sources[side.index()].set_kind(kind);
    }

    /// Render the sum of both decks into `out`
    ///
    /// Blocks longer than the prepared maximum are rendered in pieces, so the
    /// decks never see more than `max_block_size` frames at a time. Output
    /// channels beyond the prepared count are silent.
    pub fn render<B: AudioBlock + ?Sized>(&mut self, out: &mut B) {
        let total = out.num_samples();
        for ch in 0..out.num_channels() {
            out.channel_mut(ch).fill(0.0);
        }

        let block = self.scratch.capacity();
        let channels = out.num_channels().min(self.scratch.num_channels());
        if block == 0 || channels == 0 {
            return;
        }

        let mut start = 0;
        while start < total {
            let len = block.min(total - start);
            self.scratch.set_num_samples(len);

            for (deck, source) in self.decks.iter_mut().zip(&mut self.sources) {
                source.fill(&mut self.scratch);
                deck.process_block(&mut self.scratch, dry_reverb);

                for ch in 0..channels {
                    let src = self.scratch.channel(ch);
                    for (dst, s) in out.channel_mut(ch)[start..start + len].iter_mut().zip(src) {
                        *dst += *s;
                    }
                }
            }

            start += len;
        }
    }
}
