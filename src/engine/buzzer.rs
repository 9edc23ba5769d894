//! Hardware buzzer pool
//!
//! Each buzzer is a device directory exposing two text attributes:
//! `state` (`on`/`off`) and `freq` (integer Hz). A buzzer plays one note
//! at a time, so the pool spreads simultaneous notes over its devices.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::debug;

use super::{NoteOutcome, OutputEngine};
use crate::error::EngineError;
use crate::pipeline::timeline::NoteState;
use crate::temperament::Temperament;

/// Single-oscillator device
#[derive(Debug, Clone)]
pub struct Buzzer {
    device: PathBuf,
    /// (channel, note) currently sounding
    assigned: Option<(u8, i32)>,
}

impl Buzzer {
    pub fn new<P: Into<PathBuf>>(device: P) -> Self {
        Self {
            device: device.into(),
            assigned: None,
        }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    pub fn is_idle(&self) -> bool {
        self.assigned.is_none()
    }

    pub fn assignment(&self) -> Option<(u8, i32)> {
        self.assigned
    }

    fn plays(&self, channel: u8, note: i32) -> bool {
        self.assigned == Some((channel, note))
    }

    fn write_attribute(&self, name: &str, value: &str) -> Result<(), EngineError> {
        let path = self.device.join(name);
        fs::write(&path, value).map_err(|source| EngineError::Device { path, source })
    }

    pub fn set_state(&self, on: bool) -> Result<(), EngineError> {
        self.write_attribute("state", if on { "on\n" } else { "off\n" })
    }

    pub fn set_frequency(&self, hz: u32) -> Result<(), EngineError> {
        self.write_attribute("freq", &format!("{}\n", hz))
    }
}

/// Polyphonic engine over a set of buzzers
#[derive(Debug, Clone)]
pub struct BuzzerPool {
    buzzers: Vec<Buzzer>,
    temperament: Temperament,
}

impl BuzzerPool {
    pub fn new<I, P>(devices: I, temperament: Temperament) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            buzzers: devices.into_iter().map(Buzzer::new).collect(),
            temperament,
        }
    }

    pub fn buzzers(&self) -> &[Buzzer] {
        &self.buzzers
    }

    /// Prefer the buzzer whose index matches the channel, else any idle one
    fn choose(&self, channel: u8) -> Option<usize> {
        let dedicated = channel as usize;
        if self.buzzers.get(dedicated).is_some_and(Buzzer::is_idle) {
            return Some(dedicated);
        }
        self.buzzers.iter().position(Buzzer::is_idle)
    }

    fn playing(&self, channel: u8, note: i32) -> Option<usize> {
        self.buzzers.iter().position(|b| b.plays(channel, note))
    }
}

impl OutputEngine for BuzzerPool {
    fn name(&self) -> &'static str {
        "BuzzerPool"
    }

    fn open(&mut self) -> Result<(), EngineError> {
        debug!("driving {} buzzer(s)", self.buzzers.len());
        Ok(())
    }

    fn set_note(
        &mut self,
        channel: u8,
        note: i32,
        _velocity: u8,
        state: NoteState,
    ) -> Result<NoteOutcome, EngineError> {
        match state {
            NoteState::On => {
                if self.playing(channel, note).is_some() {
                    debug!("ch{:02}:{:03} already playing", channel, note);
                    return Ok(NoteOutcome::AlreadyPlaying);
                }
                let Some(index) = self.choose(channel) else {
                    debug!("no available buzzer for ch{:02}:{:03}", channel, note);
                    return Ok(NoteOutcome::NoDevice);
                };
                let hz = self.temperament.frequency(note).round().max(0.0) as u32;
                let buzzer = &mut self.buzzers[index];
                buzzer.set_frequency(hz)?;
                buzzer.set_state(true)?;
                buzzer.assigned = Some((channel, note));
                Ok(NoteOutcome::Started)
            }
            NoteState::Off => {
                let Some(index) = self.playing(channel, note) else {
                    debug!("ch{:02}:{:03} not playing", channel, note);
                    return Ok(NoteOutcome::NotPlaying);
                };
                let buzzer = &mut self.buzzers[index];
                buzzer.set_state(false)?;
                buzzer.assigned = None;
                Ok(NoteOutcome::Stopped)
            }
        }
    }

    fn wait(&mut self, duration: Duration) -> Result<(), EngineError> {
        thread::sleep(duration);
        Ok(())
    }

    /// Switch every buzzer off, reporting the first failure
    fn close(&mut self) -> Result<(), EngineError> {
        let mut result = Ok(());
        for buzzer in &mut self.buzzers {
            buzzer.assigned = None;
            if let Err(e) = buzzer.set_state(false) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn info(&self) -> String {
        format!(
            "Temperament: {}\n{}\nChannels: {}",
            self.temperament.name(),
            self.temperament.info(),
            self.buzzers.len()
        )
    }

    fn progress(&self) -> String {
        let mut line = String::from("|");
        for buzzer in &self.buzzers {
            match buzzer.assigned {
                Some((channel, note)) => {
                    let _ = write!(line, " ch{:02}:{:03} |", channel, note);
                }
                None => line.push_str(" -------- |"),
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Pool over `count` fresh device directories
    fn pool(count: usize) -> (TempDir, BuzzerPool) {
        let dir = tempfile::tempdir().unwrap();
        let devices: Vec<PathBuf> = (0..count)
            .map(|i| {
                let device = dir.path().join(format!("buzzer{}", i));
                fs::create_dir(&device).unwrap();
                device
            })
            .collect();
        (dir, BuzzerPool::new(devices, Temperament::EQUAL))
    }

    fn read(pool: &BuzzerPool, index: usize, attribute: &str) -> String {
        fs::read_to_string(pool.buzzers()[index].device().join(attribute)).unwrap()
    }

    #[test]
    fn test_note_on_writes_device() {
        let (_dir, mut pool) = pool(2);
        pool.open().unwrap();
        let outcome = pool.set_note(1, 69, 100, NoteState::On).unwrap();
        assert_eq!(outcome, NoteOutcome::Started);
        assert_eq!(read(&pool, 1, "freq"), "440\n");
        assert_eq!(read(&pool, 1, "state"), "on\n");
        assert_eq!(pool.buzzers()[1].assignment(), Some((1, 69)));
        assert!(pool.buzzers()[0].is_idle());

        let outcome = pool.set_note(1, 69, 0, NoteState::Off).unwrap();
        assert_eq!(outcome, NoteOutcome::Stopped);
        assert_eq!(read(&pool, 1, "state"), "off\n");
        assert!(pool.buzzers()[1].is_idle());
    }

    #[test]
    fn test_busy_dedicated_device_falls_back() {
        let (_dir, mut pool) = pool(2);
        pool.set_note(0, 60, 100, NoteState::On).unwrap();
        // Channel 0's buzzer is taken, buzzer 1 is idle
        let outcome = pool.set_note(0, 64, 100, NoteState::On).unwrap();
        assert_eq!(outcome, NoteOutcome::Started);
        assert_eq!(pool.buzzers()[1].assignment(), Some((0, 64)));
        assert_eq!(read(&pool, 1, "freq"), "330\n");
    }

    #[test]
    fn test_channel_beyond_pool_uses_first_idle() {
        let (_dir, mut pool) = pool(2);
        pool.set_note(9, 60, 100, NoteState::On).unwrap();
        assert_eq!(pool.buzzers()[0].assignment(), Some((9, 60)));
    }

    #[test]
    fn test_exhausted_pool_drops_note() {
        let (_dir, mut pool) = pool(1);
        pool.set_note(0, 60, 100, NoteState::On).unwrap();
        let outcome = pool.set_note(1, 62, 100, NoteState::On).unwrap();
        assert_eq!(outcome, NoteOutcome::NoDevice);
        assert_eq!(pool.buzzers()[0].assignment(), Some((0, 60)));
    }

    #[test]
    fn test_redundant_requests_are_noops() {
        let (_dir, mut pool) = pool(2);
        assert_eq!(
            pool.set_note(0, 60, 0, NoteState::Off).unwrap(),
            NoteOutcome::NotPlaying
        );
        pool.set_note(0, 60, 100, NoteState::On).unwrap();
        assert_eq!(
            pool.set_note(0, 60, 100, NoteState::On).unwrap(),
            NoteOutcome::AlreadyPlaying
        );
        assert!(pool.buzzers()[1].is_idle());
    }

    #[test]
    fn test_close_silences_all() {
        let (_dir, mut pool) = pool(3);
        pool.set_note(0, 60, 100, NoteState::On).unwrap();
        pool.set_note(2, 67, 100, NoteState::On).unwrap();
        pool.close().unwrap();
        for i in 0..3 {
            assert_eq!(read(&pool, i, "state"), "off\n");
            assert!(pool.buzzers()[i].is_idle());
        }
    }

    #[test]
    fn test_missing_device_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = BuzzerPool::new([dir.path().join("absent")], Temperament::EQUAL);
        let err = pool.set_note(0, 60, 100, NoteState::On).unwrap_err();
        assert!(matches!(err, EngineError::Device { .. }));
        assert!(pool.buzzers()[0].is_idle());
    }

    #[test]
    fn test_progress_line() {
        let (_dir, mut pool) = pool(2);
        pool.set_note(0, 60, 100, NoteState::On).unwrap();
        assert_eq!(pool.progress(), "| ch00:060 | -------- |");
        assert!(pool.info().ends_with("Channels: 2"));
    }
}
