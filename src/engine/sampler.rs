//! Software sampler
//!
//! Every `wait` renders exactly the requested span of audio: each active
//! voice is synthesized into a scratch buffer, scaled by the gain, then
//! mixed into a PCM tick buffer that is appended to the WAV file. Voices
//! whose release has decayed are dropped on the tick where that happens.

use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

use log::{debug, info};

use super::{NoteOutcome, OutputEngine};
use crate::config::SamplerConfig;
use crate::error::{ConfigError, EngineError};
use crate::generator::{GeneratorState, Instrument, SignalGenerator};
use crate::pcm::PcmBuffer;
use crate::pipeline::timeline::NoteState;
use crate::temperament::Temperament;
use crate::wav::WavWriter;

/// Musical time rendered after the last event so releases can ring out
pub const RELEASE_TAIL: Duration = Duration::from_secs(1);

/// An active note
#[derive(Debug, Clone)]
struct Voice {
    channel: u8,
    note: i32,
    instrument: Instrument,
    /// 0.0 full left to 1.0 full right, when autopanned
    pan: Option<f32>,
}

impl Voice {
    fn matches(&self, channel: u8, note: i32) -> bool {
        self.channel == channel && self.note == note && !self.instrument.is_released()
    }
}

#[derive(Debug)]
pub struct Sampler {
    config: SamplerConfig,
    temperament: Temperament,
    voices: Vec<Voice>,
    /// Playback time requested since open
    elapsed: Duration,
    /// Frames rendered since open
    position: u64,
    speed: f64,
    writer: Option<WavWriter<BufWriter<File>>>,
    scratch: Vec<f32>,
}

impl Sampler {
    pub fn new(config: SamplerConfig, temperament: Temperament) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            temperament,
            voices: Vec::new(),
            elapsed: Duration::ZERO,
            position: 0,
            speed: 1.0,
            writer: None,
            scratch: Vec::new(),
        })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn pan_for(&self, note: i32) -> Option<f32> {
        (self.config.autopan && self.config.channels == 2)
            .then(|| (note as f32 / 127.0).clamp(0.0, 1.0))
    }

    /// Frame index closest to `time` at the output rate
    fn frame_at(&self, time: Duration) -> u64 {
        let frames = time.as_micros() as f64 * self.config.sample_rate as f64 / 1_000_000.0;
        frames.round() as u64
    }

    /// Release tail in playback time
    pub fn tail(&self) -> Duration {
        Duration::from_micros((RELEASE_TAIL.as_micros() as f64 / self.speed) as u64)
    }

    fn render(&mut self, frames: usize) -> Result<PcmBuffer, EngineError> {
        let channels = self.config.channels;
        let gain = self.config.gain;
        let mut buffer = PcmBuffer::new(frames, channels, self.config.format);
        self.scratch.resize(frames, 0.0);

        for voice in &mut self.voices {
            let state = voice.instrument.process(&mut self.scratch);
            for (frame, &sample) in self.scratch.iter().enumerate() {
                let value = sample * gain;
                match voice.pan {
                    Some(pan) => {
                        buffer.increment(frame, 0, value * (1.0 - pan))?;
                        buffer.increment(frame, 1, value * pan)?;
                    }
                    None => {
                        let output = voice.channel as u16 % channels;
                        buffer.increment(frame, output, value)?;
                    }
                }
            }
            if state == GeneratorState::Complete {
                debug!("ch{:02}:{:03} finished", voice.channel, voice.note);
            }
        }

        self.voices.retain(|voice| !voice.instrument.is_complete());
        Ok(buffer)
    }
}

impl OutputEngine for Sampler {
    fn name(&self) -> &'static str {
        "Sampler"
    }

    fn open(&mut self) -> Result<(), EngineError> {
        if self.writer.is_some() {
            return Err(EngineError::AlreadyOpen);
        }
        let writer = WavWriter::create(&self.config.output, self.config.wav_spec())?;
        info!("writing {}", self.config.output.display());
        self.writer = Some(writer);
        self.elapsed = Duration::ZERO;
        self.position = 0;
        Ok(())
    }

    fn set_note(
        &mut self,
        channel: u8,
        note: i32,
        velocity: u8,
        state: NoteState,
    ) -> Result<NoteOutcome, EngineError> {
        let existing = self.voices.iter().position(|v| v.matches(channel, note));
        match state {
            NoteState::On => {
                if existing.is_some() {
                    debug!("ch{:02}:{:03} already playing", channel, note);
                    return Ok(NoteOutcome::AlreadyPlaying);
                }
                let instrument = Instrument::new(
                    self.config.instrument.profile(),
                    self.temperament.frequency(note),
                    velocity,
                    self.config.sample_rate,
                );
                let pan = self.pan_for(note);
                self.voices.push(Voice {
                    channel,
                    note,
                    instrument,
                    pan,
                });
                Ok(NoteOutcome::Started)
            }
            NoteState::Off => match existing {
                Some(index) => {
                    self.voices[index].instrument.note_off();
                    Ok(NoteOutcome::Stopped)
                }
                None => {
                    debug!("ch{:02}:{:03} not playing", channel, note);
                    Ok(NoteOutcome::NotPlaying)
                }
            },
        }
    }

    fn wait(&mut self, duration: Duration) -> Result<(), EngineError> {
        if self.writer.is_none() {
            return Err(EngineError::NotOpen);
        }
        // Frames follow the total elapsed time so rounding never accumulates
        self.elapsed += duration;
        let frames = self.frame_at(self.elapsed).saturating_sub(self.position);
        let buffer = self.render(frames as usize)?;
        self.position += frames;
        if let Some(writer) = self.writer.as_mut() {
            writer.write_buffer(&buffer)?;
        }
        Ok(())
    }

    fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
        }
    }

    /// Render the release tail and finish the WAV header
    fn close(&mut self) -> Result<(), EngineError> {
        self.wait(self.tail())?;
        let writer = self.writer.take().ok_or(EngineError::NotOpen)?;
        let frames = writer.frames();
        writer.finalize()?;
        self.voices.clear();
        info!("wrote {} frames to {}", frames, self.config.output.display());
        Ok(())
    }

    fn info(&self) -> String {
        let mut lines = vec![
            format!("Temperament: {}", self.temperament.name()),
            self.temperament.info(),
            format!("Gain: {:.0}%", self.config.gain * 100.0),
            format!("Samplerate: {} hz", self.config.sample_rate),
            format!("Samples size: {} bits", self.config.format.bits()),
            format!("Channels: {}", self.config.channels),
        ];
        if self.config.channels == 2 {
            let autopan = if self.config.autopan { "on" } else { "off" };
            lines.push(format!("Autopan: {}", autopan));
        }
        lines.push(format!("Instrument: {}", self.config.instrument));
        lines.join("\n")
    }

    fn progress(&self) -> String {
        let seconds = self.position / self.config.sample_rate as u64;
        let (m, s) = (seconds / 60, seconds % 60);
        if m > 0 {
            format!("Processing... {}:{:02}", m, s)
        } else {
            format!("Processing... {}s", s)
        }
    }
}
