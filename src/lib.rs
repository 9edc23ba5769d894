//! MIDI file player
//!
//! Decodes Standard MIDI Files into a note timeline and plays it through an
//! output engine: a pool of hardware buzzers or a software sampler that
//! synthesizes additive harmonics into a WAV file.

pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod midi;
pub mod pcm;
pub mod pipeline;
pub mod temperament;
pub mod wav;
