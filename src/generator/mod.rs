//! Sample generators
//!
//! - `envelope`: exponential-curve ADSR amplitude shape
//! - `instrument`: additive harmonic oscillator driven by an envelope

pub mod envelope;
pub mod instrument;

pub use envelope::{AdsrPhase, EnvelopeShape};
pub use instrument::{Instrument, InstrumentKind, InstrumentProfile};

/// Represents the current state of a signal generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Generator is still producing samples
    Running,
    /// Generator has completed and will produce no more samples
    Complete,
}

/// Core trait for all signal generators
///
/// Signal generators produce audio samples frame by frame, continuing from
/// where the previous call stopped.
pub trait SignalGenerator {
    /// Fill the next `buffer.len()` samples
    ///
    /// Once the generator completes, the remainder of the buffer is zeroed
    /// and `GeneratorState::Complete` is returned.
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState;

    /// Check if this generator has completed
    fn is_complete(&self) -> bool;
}
