//! Output engines
//!
//! The player drives an engine through [`OutputEngine`] only. Two engines
//! exist: a pool of hardware buzzers and a software sampler rendering to a
//! WAV file. [`Engine`] is the closed set of both, selected at startup.

pub mod buzzer;
pub mod sampler;

use std::time::Duration;

pub use buzzer::{Buzzer, BuzzerPool};
pub use sampler::Sampler;

use crate::error::EngineError;
use crate::pipeline::timeline::NoteState;

/// Result of a note request that did not fail
///
/// Rejected requests are not errors: playback continues past them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteOutcome {
    /// A voice or device started sounding
    Started,
    /// A sounding note was released
    Stopped,
    /// Note-on for a note that is already sounding; nothing changed
    AlreadyPlaying,
    /// Note-off for a note that is not sounding; nothing changed
    NotPlaying,
    /// No free device to play the note on; the note is dropped
    NoDevice,
}

/// Capability set shared by every output engine
pub trait OutputEngine {
    fn name(&self) -> &'static str;

    /// Prepare the sink before the first note
    fn open(&mut self) -> Result<(), EngineError>;

    /// Start or release a note; `note` is already transposed
    fn set_note(
        &mut self,
        channel: u8,
        note: i32,
        velocity: u8,
        state: NoteState,
    ) -> Result<NoteOutcome, EngineError>;

    /// Let `duration` of playback time pass
    fn wait(&mut self, duration: Duration) -> Result<(), EngineError>;

    /// Playback speed multiplier, announced before `open`
    ///
    /// Engines that render extra time on `close` scale it by this.
    fn set_speed(&mut self, _speed: f64) {}

    /// Silence and flush; called once, even after a cancelled run
    fn close(&mut self) -> Result<(), EngineError>;

    /// Multi-line description of the engine settings
    fn info(&self) -> String;

    /// One-line progress indicator
    fn progress(&self) -> String;
}

/// The engine selected from configuration
#[derive(Debug)]
pub enum Engine {
    Buzzer(BuzzerPool),
    Sampler(Sampler),
}

impl OutputEngine for Engine {
    fn name(&self) -> &'static str {
        match self {
            Engine::Buzzer(pool) => pool.name(),
            Engine::Sampler(sampler) => sampler.name(),
        }
    }

    fn open(&mut self) -> Result<(), EngineError> {
        match self {
            Engine::Buzzer(pool) => pool.open(),
            Engine::Sampler(sampler) => sampler.open(),
        }
    }

    fn set_note(
        &mut self,
        channel: u8,
        note: i32,
        velocity: u8,
        state: NoteState,
    ) -> Result<NoteOutcome, EngineError> {
        match self {
            Engine::Buzzer(pool) => pool.set_note(channel, note, velocity, state),
            Engine::Sampler(sampler) => sampler.set_note(channel, note, velocity, state),
        }
    }

    fn wait(&mut self, duration: Duration) -> Result<(), EngineError> {
        match self {
            Engine::Buzzer(pool) => pool.wait(duration),
            Engine::Sampler(sampler) => sampler.wait(duration),
        }
    }

    fn set_speed(&mut self, speed: f64) {
        match self {
            Engine::Buzzer(pool) => pool.set_speed(speed),
            Engine::Sampler(sampler) => sampler.set_speed(speed),
        }
    }

    fn close(&mut self) -> Result<(), EngineError> {
        match self {
            Engine::Buzzer(pool) => pool.close(),
            Engine::Sampler(sampler) => sampler.close(),
        }
    }

    fn info(&self) -> String {
        match self {
            Engine::Buzzer(pool) => pool.info(),
            Engine::Sampler(sampler) => sampler.info(),
        }
    }

    fn progress(&self) -> String {
        match self {
            Engine::Buzzer(pool) => pool.progress(),
            Engine::Sampler(sampler) => sampler.progress(),
        }
    }
}
