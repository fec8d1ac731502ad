//! otodeck core: the per-deck filter chain and the types around it
//!
//! Everything that runs on the audio thread lives under [`domain::dsp`];
//! configuration, runtime commands and signal sources sit next to it.

pub mod domain;
