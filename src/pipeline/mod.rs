//! Playback pipeline
//!
//! - Timeline: note events stamped with absolute times, sorted for playback
//! - Player: speed-scaled, cancellable walk of the timeline into an engine

pub mod player;
pub mod timeline;

pub use player::{CancelToken, PlaybackReport, Player};
pub use timeline::{NoteEvent, NoteState, Timeline};
