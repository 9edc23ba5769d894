//! Playback and engine configuration
//!
//! Values arrive from the command line; everything is validated here, before
//! any file is parsed, so a bad option never costs a decode.

use std::path::PathBuf;

use log::info;

use crate::engine::{BuzzerPool, Engine, Sampler};
use crate::error::ConfigError;
use crate::generator::InstrumentKind;
use crate::pcm::SampleFormat;
use crate::temperament::Temperament;
use crate::wav::WavSpec;

/// Settings shared by every engine
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Tempo multiplier, 1.0 plays at the written tempo
    pub speed: f64,
    /// Semitones added to every note
    pub transposition: i32,
    /// Temperament identifier
    pub temperament: String,
    /// Reference pitch of A3 in Hz
    pub pitch: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            transposition: 0,
            temperament: "equal".to_string(),
            pitch: 440.0,
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        if !self.pitch.is_finite() || self.pitch <= 0.0 {
            return Err(ConfigError::InvalidPitch(self.pitch));
        }
        Ok(())
    }

    /// The selected temperament tuned to the reference pitch
    pub fn temperament(&self) -> Result<Temperament, ConfigError> {
        let mut temperament = Temperament::by_name(&self.temperament)?;
        temperament.set_reference_pitch(self.pitch)?;
        Ok(temperament)
    }
}

/// Software synthesis to a WAV file
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub output: PathBuf,
    pub channels: u16,
    pub sample_rate: u32,
    pub format: SampleFormat,
    /// Linear gain applied to every voice
    pub gain: f32,
    /// Pan low notes left and high notes right (stereo only)
    pub autopan: bool,
    pub instrument: InstrumentKind,
}

impl SamplerConfig {
    pub const MAX_CHANNELS: u16 = 16;
    pub const MIN_SAMPLE_RATE: u32 = 12000;

    /// Default settings writing to `output`
    pub fn new<P: Into<PathBuf>>(output: P) -> Self {
        Self {
            output: output.into(),
            channels: 2,
            sample_rate: 44100,
            format: SampleFormat::I32,
            gain: 0.2,
            autopan: false,
            instrument: InstrumentKind::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 || self.channels > Self::MAX_CHANNELS {
            return Err(ConfigError::InvalidChannels(self.channels));
        }
        if self.sample_rate < Self::MIN_SAMPLE_RATE {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if !self.gain.is_finite() || self.gain < 0.0 {
            return Err(ConfigError::InvalidGain(self.gain));
        }
        Ok(())
    }

    pub fn wav_spec(&self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            format: self.format,
        }
    }
}

/// Hardware buzzers driven through device files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuzzerConfig {
    pub devices: Vec<PathBuf>,
}

impl BuzzerConfig {
    /// Parse a `:`-separated device list
    pub fn from_device_list(list: &str) -> Result<Self, ConfigError> {
        let config = Self {
            devices: list
                .split(':')
                .filter(|device| !device.is_empty())
                .map(PathBuf::from)
                .collect(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }
        Ok(())
    }
}

/// Engine candidates; exactly one must be present
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub sampler: Option<SamplerConfig>,
    pub buzzer: Option<BuzzerConfig>,
}

impl EngineConfig {
    /// Build the single configured engine
    pub fn resolve(self, temperament: Temperament) -> Result<Engine, ConfigError> {
        match (self.sampler, self.buzzer) {
            (None, None) => Err(ConfigError::NoEngine),
            (Some(_), Some(_)) => Err(ConfigError::ConflictingEngines),
            (Some(sampler), None) => {
                info!("rendering to {}", sampler.output.display());
                Ok(Engine::Sampler(Sampler::new(sampler, temperament)?))
            }
            (None, Some(buzzer)) => {
                buzzer.validate()?;
                info!("driving {} buzzer device(s)", buzzer.devices.len());
                Ok(Engine::Buzzer(BuzzerPool::new(buzzer.devices, temperament)))
            }
        }
    }
}
