//! Timeline playback
//!
//! Walks the sorted timeline, letting the engine wait out the gap before
//! each event (scaled by the playback speed) and dispatching transposed
//! notes. The engine is always closed, whether the walk finishes, fails, or
//! is cancelled.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::PlaybackConfig;
use crate::engine::{NoteOutcome, OutputEngine};
use crate::error::{ConfigError, EngineError};
use crate::pipeline::timeline::Timeline;

/// Cooperative stop request, shared with a signal handler
///
/// Checked once per event, between the wait and the dispatch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What happened to the dispatched notes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Events handed to the engine
    pub dispatched: usize,
    pub started: usize,
    pub stopped: usize,
    /// Note-on for an already sounding note
    pub rejected: usize,
    /// Note-off for a silent note
    pub ignored: usize,
    /// Note-on with no free device
    pub dropped: usize,
    pub cancelled: bool,
}

impl PlaybackReport {
    fn record(&mut self, outcome: NoteOutcome) {
        self.dispatched += 1;
        match outcome {
            NoteOutcome::Started => self.started += 1,
            NoteOutcome::Stopped => self.stopped += 1,
            NoteOutcome::AlreadyPlaying => self.rejected += 1,
            NoteOutcome::NotPlaying => self.ignored += 1,
            NoteOutcome::NoDevice => self.dropped += 1,
        }
    }
}

impl fmt::Display for PlaybackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events: {} started, {} stopped, {} rejected, {} ignored, {} dropped",
            self.dispatched, self.started, self.stopped, self.rejected, self.ignored, self.dropped
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

type ProgressFn = Box<dyn FnMut(&str)>;

pub struct Player {
    timeline: Timeline,
    speed: f64,
    transposition: i32,
    progress: Option<ProgressFn>,
}

impl Player {
    /// Create a player with an empty timeline
    ///
    /// `speed` multiplies the tempo and must be positive.
    pub fn new(speed: f64, transposition: i32) -> Result<Self, ConfigError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ConfigError::InvalidSpeed(speed));
        }
        Ok(Self {
            timeline: Timeline::new(),
            speed,
            transposition,
            progress: None,
        })
    }

    pub fn from_config(config: &PlaybackConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(config.speed, config.transposition)
    }

    /// Receive the engine progress line after every wait
    pub fn on_progress<F: FnMut(&str) + 'static>(mut self, callback: F) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Timeline to decode into
    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn transposition(&self) -> i32 {
        self.transposition
    }

    pub fn info(&self) -> String {
        let mut info = format!("speed: {:.0}%", self.speed * 100.0);
        if self.transposition != 0 {
            info.push_str(&format!("\ntransposition: {}", self.transposition));
        }
        info
    }

    /// Scale a musical gap to playback time
    fn scaled(&self, gap: Duration) -> Duration {
        Duration::from_micros((gap.as_micros() as f64 / self.speed) as u64)
    }

    /// Play the whole timeline through `engine`
    pub fn play<E: OutputEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        cancel: &CancelToken,
    ) -> Result<PlaybackReport, EngineError> {
        self.timeline.sort();
        engine.set_speed(self.speed);
        engine.open()?;
        info!(
            "playing {} events through {}",
            self.timeline.len(),
            engine.name()
        );

        let walked = self.walk(engine, cancel);
        let closed = engine.close();
        let report = walked?;
        closed?;

        info!("{}", report);
        Ok(report)
    }

    fn walk<E: OutputEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        cancel: &CancelToken,
    ) -> Result<PlaybackReport, EngineError> {
        let mut report = PlaybackReport::default();
        let mut last = Duration::ZERO;

        for index in 0..self.timeline.len() {
            let event = self.timeline.events()[index];
            if event.time > last {
                engine.wait(self.scaled(event.time - last))?;
                if let Some(progress) = self.progress.as_mut() {
                    progress(&engine.progress());
                }
            }

            if cancel.is_cancelled() {
                warn!("playback cancelled at {} ms", event.time_ms());
                report.cancelled = true;
                break;
            }

            last = event.time;
            let note = event.note as i32 + self.transposition;
            let outcome = engine.set_note(event.channel, note, event.velocity, event.state)?;
            if outcome != NoteOutcome::Started && outcome != NoteOutcome::Stopped {
                debug!("{} ms ch{:02}:{:03}: {:?}", event.time_ms(), event.channel, note, outcome);
            }
            report.record(outcome);
        }

        Ok(report)
    }
}
