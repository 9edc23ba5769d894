//! Tuning systems mapping MIDI note numbers to frequencies

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

const NOTE_A3: i32 = 69;

/// Just intonation ratios of each pitch class over C
const DOM_BEDOS_SCALE: [f32; 12] = [
    1.0,           // C
    256.0 / 243.0, // Db
    9.0 / 8.0,     // D
    32.0 / 27.0,   // Eb
    5.0 / 4.0,     // E
    4.0 / 3.0,     // F
    45.0 / 32.0,   // F#
    3.0 / 2.0,     // G
    128.0 / 81.0,  // Ab
    161.0 / 96.0,  // A, between D + fifth and E - fifth
    16.0 / 9.0,    // Bb
    15.0 / 8.0,    // B
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Temperament {
    /// Twelve equal semitones relative to the A3 reference
    Equal { a3: f32 },
    /// Fixed ratios per pitch class, scaled by octave from C3
    DomBedos { c3: f32 },
}

impl Default for Temperament {
    fn default() -> Self {
        Temperament::EQUAL
    }
}

impl Temperament {
    pub const EQUAL: Temperament = Temperament::Equal { a3: 440.0 };
    pub const DOM_BEDOS: Temperament = Temperament::DomBedos { c3: 264.0 };

    /// Every selectable tuning, with its default reference pitch
    pub const ALL: [Temperament; 2] = [Temperament::EQUAL, Temperament::DOM_BEDOS];

    /// Look a tuning up by its identifier
    pub fn by_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|t| t.id() == name)
            .ok_or_else(|| ConfigError::UnknownTemperament(name.to_string()))
    }

    /// Short identifier used on the command line
    pub fn id(&self) -> &'static str {
        match self {
            Temperament::Equal { .. } => "equal",
            Temperament::DomBedos { .. } => "dom-bedos",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Temperament::Equal { .. } => "Equal Temperament",
            Temperament::DomBedos { .. } => "Dom Bedos Temperament",
        }
    }

    /// Frequency in Hz of a MIDI note number
    ///
    /// Notes outside 0..=127 are extrapolated, which transposition can
    /// produce.
    pub fn frequency(&self, note: i32) -> f32 {
        match *self {
            Temperament::Equal { a3 } => a3 * ((note - NOTE_A3) as f32 / 12.0).exp2(),
            Temperament::DomBedos { c3 } => {
                let octave = note.div_euclid(12) - 5;
                let class = note.rem_euclid(12) as usize;
                c3 * DOM_BEDOS_SCALE[class] * (octave as f32).exp2()
            }
        }
    }

    /// Retune so that A3 sounds at `hz`
    pub fn set_reference_pitch(&mut self, hz: f32) -> Result<(), ConfigError> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(ConfigError::InvalidPitch(hz));
        }
        match self {
            Temperament::Equal { a3 } => *a3 = hz,
            Temperament::DomBedos { c3 } => *c3 = hz / DOM_BEDOS_SCALE[9],
        }
        Ok(())
    }

    /// Reference note and its frequency, for display
    pub fn info(&self) -> String {
        match self {
            Temperament::Equal { a3 } => format!("A3 frequency: {:.1} hz", a3),
            Temperament::DomBedos { c3 } => format!("C3 frequency: {:.1} hz", c3),
        }
    }
}

impl fmt::Display for Temperament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Temperament {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::by_name(s)
    }
}
