//! Additive instruments
//!
//! A voice is the sum of up to [`PARTIALS`] harmonics of its fundamental,
//! each weighted by the profile spectrum and the note velocity, then shaped
//! by the profile envelope.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use super::envelope::EnvelopeShape;
use super::{GeneratorState, SignalGenerator};
use crate::error::ConfigError;

/// Number of harmonic slots in a spectrum
pub const PARTIALS: usize = 20;

/// Spectrum and envelope describing one instrument timbre
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentProfile {
    pub name: &'static str,
    /// Gain of harmonic `n + 1` at index `n`
    pub spectrum: [f32; PARTIALS],
    pub envelope: EnvelopeShape,
}

const fn spectrum<const N: usize>(gains: [f32; N]) -> [f32; PARTIALS] {
    let mut out = [0.0; PARTIALS];
    let mut i = 0;
    while i < N {
        out[i] = gains[i];
        i += 1;
    }
    out
}

const STRUCK: EnvelopeShape = EnvelopeShape {
    attack: 0.02,
    attack_curve: -0.3,
    decay: 1.0,
    min_hold: 0.0,
    decay_curve: -0.35,
    sustain: 0.1,
    release: 1.0,
    release_curve: -0.5,
};

pub const ORGAN: InstrumentProfile = InstrumentProfile {
    name: "organ",
    spectrum: spectrum([0.8, 0.8, 0.8, 1.0, 0.8, 0.8, 0.6, 0.4, 0.2, 0.1]),
    envelope: EnvelopeShape {
        attack: 0.01,
        attack_curve: -0.45,
        decay: 0.1,
        min_hold: 0.0,
        decay_curve: -0.48,
        sustain: 0.8,
        release: 0.5,
        release_curve: -0.5,
    },
};

pub const HARP: InstrumentProfile = InstrumentProfile {
    name: "harp",
    spectrum: spectrum([1.0, 0.6, 0.4, 0.2, 0.1, 0.05, 0.01, 0.005, 0.002, 0.001]),
    envelope: EnvelopeShape {
        attack: 0.02,
        attack_curve: -0.45,
        decay: 1.0,
        min_hold: 0.5,
        decay_curve: -0.35,
        sustain: 0.05,
        release: 0.5,
        release_curve: -0.25,
    },
};

pub const PIANO: InstrumentProfile = InstrumentProfile {
    name: "piano",
    spectrum: spectrum([1.0, 0.25, 0.2, 0.125, 0.125, 0.125, 0.025, 0.025, 0.002, 0.001]),
    envelope: STRUCK,
};

pub const XYLOPHONE: InstrumentProfile = InstrumentProfile {
    name: "xylophone",
    spectrum: spectrum([1.0, 0.1]),
    envelope: STRUCK,
};

pub const GLOCKENSPIEL: InstrumentProfile = InstrumentProfile {
    name: "glockenspiel",
    spectrum: spectrum([1.0, 0.25, 0.05]),
    envelope: STRUCK,
};

/// Selectable instrument timbres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstrumentKind {
    Organ,
    Harp,
    #[default]
    Piano,
    Xylophone,
    Glockenspiel,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 5] = [
        InstrumentKind::Organ,
        InstrumentKind::Harp,
        InstrumentKind::Piano,
        InstrumentKind::Xylophone,
        InstrumentKind::Glockenspiel,
    ];

    pub fn profile(self) -> &'static InstrumentProfile {
        match self {
            InstrumentKind::Organ => &ORGAN,
            InstrumentKind::Harp => &HARP,
            InstrumentKind::Piano => &PIANO,
            InstrumentKind::Xylophone => &XYLOPHONE,
            InstrumentKind::Glockenspiel => &GLOCKENSPIEL,
        }
    }

    pub fn name(self) -> &'static str {
        self.profile().name
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InstrumentKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownInstrument(s.to_string()))
    }
}

/// One sounding note
#[derive(Debug, Clone)]
pub struct Instrument {
    profile: &'static InstrumentProfile,
    fundamental: f64,
    velocity: u8,
    sample_rate: u32,
    /// Samples rendered since note start
    position: u64,
    /// Seconds after note start at which the note was released
    released_at: Option<f32>,
    complete: bool,
}

impl Instrument {
    pub fn new(
        profile: &'static InstrumentProfile,
        fundamental: f32,
        velocity: u8,
        sample_rate: u32,
    ) -> Self {
        Self {
            profile,
            fundamental: fundamental as f64,
            velocity,
            sample_rate,
            position: 0,
            released_at: None,
            complete: false,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_released(&self) -> bool {
        self.released_at.is_some()
    }

    /// Release the note at the current render position
    ///
    /// A second release keeps the first release time.
    pub fn note_off(&mut self) {
        if self.released_at.is_none() {
            self.released_at = Some(self.elapsed() as f32);
        }
    }

    fn elapsed(&self) -> f64 {
        self.position as f64 / self.sample_rate as f64
    }

    /// Sample value `t` seconds after note start, `None` once finished
    pub fn value_at(&self, t: f64) -> Option<f32> {
        let level = self.profile.envelope.level(t as f32, self.released_at)?;
        let velocity = self.velocity as f64 / 127.0;

        let mut value = 0.0;
        for (n, &gain) in self.profile.spectrum.iter().enumerate() {
            if gain == 0.0 {
                continue;
            }
            let harmonic = (n + 1) as f64 * self.fundamental;
            value += gain as f64 * velocity * (TAU * harmonic * t).sin();
        }
        Some(value as f32 * level)
    }
}

impl SignalGenerator for Instrument {
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState {
        for i in 0..buffer.len() {
            let value = if self.complete {
                None
            } else {
                self.value_at(self.elapsed())
            };
            match value {
                Some(value) => {
                    buffer[i] = value;
                    self.position += 1;
                }
                None => {
                    self.complete = true;
                    buffer[i..].fill(0.0);
                    break;
                }
            }
        }

        if self.complete {
            GeneratorState::Complete
        } else {
            GeneratorState::Running
        }
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RATE: u32 = 8000;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("organ".parse::<InstrumentKind>(), Ok(InstrumentKind::Organ));
        assert_eq!("Harp".parse::<InstrumentKind>(), Ok(InstrumentKind::Harp));
        assert_eq!(InstrumentKind::default(), InstrumentKind::Piano);
        assert_eq!(
            "kazoo".parse::<InstrumentKind>(),
            Err(ConfigError::UnknownInstrument("kazoo".to_string()))
        );
    }

    #[test]
    fn test_spectrum_padding() {
        assert_eq!(XYLOPHONE.spectrum[..3], [1.0, 0.1, 0.0]);
        assert!(ORGAN.spectrum[10..].iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_starts_silent() {
        let voice = Instrument::new(&PIANO, 440.0, 100, RATE);
        assert_abs_diff_eq!(voice.value_at(0.0).unwrap(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_velocity_scales_output() {
        let loud = Instrument::new(&XYLOPHONE, 220.0, 127, RATE);
        let soft = Instrument::new(&XYLOPHONE, 220.0, 64, RATE);
        let t = 0.1013;
        let ratio = soft.value_at(t).unwrap() / loud.value_at(t).unwrap();
        assert_abs_diff_eq!(ratio, 64.0 / 127.0, epsilon = 1e-4);
    }

    #[test]
    fn test_sustains_until_released() {
        let mut voice = Instrument::new(&ORGAN, 440.0, 100, RATE);
        let mut buffer = vec![0.0; RATE as usize * 3];
        assert_eq!(voice.process(&mut buffer), GeneratorState::Running);
        assert!(buffer.iter().any(|&v| v.abs() > 0.1));
        assert!(!voice.is_complete());
    }

    #[test]
    fn test_release_completes() {
        let mut voice = Instrument::new(&ORGAN, 440.0, 100, RATE);
        let mut buffer = vec![0.0; RATE as usize / 10];
        voice.process(&mut buffer);
        voice.note_off();
        assert!(voice.is_released());

        // Organ releases over half a second
        let mut tail = vec![1.0; RATE as usize];
        assert_eq!(voice.process(&mut tail), GeneratorState::Complete);
        assert!(voice.is_complete());
        assert!(tail[RATE as usize - 1] == 0.0);
        let rendered = voice.position();
        assert!(rendered > (RATE as u64 * 6) / 10 - 2 && rendered < (RATE as u64 * 6) / 10 + 2);

        let mut more = vec![1.0; 16];
        assert_eq!(voice.process(&mut more), GeneratorState::Complete);
        assert!(more.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_second_note_off_keeps_release_time() {
        let mut voice = Instrument::new(&PIANO, 440.0, 100, RATE);
        voice.note_off();
        let mut buffer = vec![0.0; 100];
        voice.process(&mut buffer);
        voice.note_off();
        assert_eq!(voice.released_at, Some(0.0));
    }
}
