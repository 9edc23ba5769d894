//! Note events collected from a decoded file
//!
//! The decoder advances the timeline clock as it reads delta-times and
//! appends a [`NoteEvent`] for every note-on/off. Once the file is fully
//! parsed, the events are sorted into playback order.

use std::cmp::Ordering;
use std::time::Duration;

/// Whether a note starts or stops
///
/// `Off` orders before `On`, so at equal timestamps releases are handled
/// before new attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoteState {
    Off,
    On,
}

/// A single note-on or note-off at an absolute time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    /// Time since the start of the sequence
    pub time: Duration,
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    pub state: NoteState,
}

impl NoteEvent {
    /// Event time in whole milliseconds
    pub fn time_ms(&self) -> u64 {
        self.time.as_millis() as u64
    }

    /// Playback order: time ascending, off before on at equal time
    pub fn playback_cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.state.cmp(&other.state))
    }
}

/// Insertion-ordered event collection with a running clock
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Vec<NoteEvent>,
    clock: Duration,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock position new events are stamped with
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Move the clock forward
    pub fn advance(&mut self, delta: Duration) {
        self.clock += delta;
    }

    /// Move the clock back to zero (start of an independent track)
    pub fn rewind(&mut self) {
        self.clock = Duration::ZERO;
    }

    /// Record a note event at the current clock position
    pub fn push(&mut self, channel: u8, note: u8, velocity: u8, state: NoteState) {
        self.events.push(NoteEvent {
            time: self.clock,
            channel,
            note,
            velocity,
            state,
        });
    }

    /// Stable sort into playback order
    pub fn sort(&mut self) {
        self.events.sort_by(NoteEvent::playback_cmp);
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Latest event time, or zero for an empty timeline
    pub fn end_time(&self) -> Duration {
        self.events
            .iter()
            .map(|e| e.time)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    pub fn count(&self, state: NoteState) -> usize {
        self.events.iter().filter(|e| e.state == state).count()
    }
}
