//! Platform layer for otodeck: CPAL devices, the output stream and the
//! two-deck render engine

pub mod audio;

pub use audio::{render_interleaved, CpalDevice, CpalEnumerator, DeckEngine, OutputStream};
