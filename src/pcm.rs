//! Interleaved PCM sample buffer
//!
//! A buffer holds `frames x channels` samples of a single format. Values are
//! given as floats in `[-1.0, 1.0]`; each format maps them onto its own
//! integer range and clamps on the way in.

use std::io::{self, Write};

use crate::error::{ConfigError, PcmIndexError};

/// Integer sample encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Unsigned 8-bit, silence at 128
    U8,
    I16,
    I32,
}

impl SampleFormat {
    pub fn from_bits(bits: u16) -> Result<Self, ConfigError> {
        match bits {
            8 => Ok(SampleFormat::U8),
            16 => Ok(SampleFormat::I16),
            32 => Ok(SampleFormat::I32),
            other => Err(ConfigError::InvalidSampleBits(other)),
        }
    }

    pub fn bits(self) -> u16 {
        self.bytes() * 8
    }

    pub fn bytes(self) -> u16 {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 => 2,
            SampleFormat::I32 => 4,
        }
    }
}

const U8_NEUTRAL: i64 = 128;
const U8_AMPLITUDE: f64 = 127.0;
const I16_MAX: i64 = 0x7fff;
const I32_MAX: i64 = 0x7fff_ffff;

#[derive(Debug, Clone, PartialEq)]
enum Samples {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
}

/// Fixed-size interleaved PCM buffer
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Samples,
    frames: usize,
    channels: u16,
}

impl PcmBuffer {
    /// Silent buffer of `frames` frames
    pub fn new(frames: usize, channels: u16, format: SampleFormat) -> Self {
        let len = frames * channels as usize;
        let samples = match format {
            SampleFormat::U8 => Samples::U8(vec![U8_NEUTRAL as u8; len]),
            SampleFormat::I16 => Samples::I16(vec![0; len]),
            SampleFormat::I32 => Samples::I32(vec![0; len]),
        };
        Self {
            samples,
            frames,
            channels,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn format(&self) -> SampleFormat {
        match self.samples {
            Samples::U8(_) => SampleFormat::U8,
            Samples::I16(_) => SampleFormat::I16,
            Samples::I32(_) => SampleFormat::I32,
        }
    }

    fn index(&self, frame: usize, channel: u16) -> Result<usize, PcmIndexError> {
        if frame >= self.frames || channel >= self.channels {
            return Err(PcmIndexError {
                frame,
                channel,
                frames: self.frames,
                channels: self.channels,
            });
        }
        Ok(frame * self.channels as usize + channel as usize)
    }

    /// Overwrite one sample; `value` is clamped to `[-1.0, 1.0]` first
    pub fn set(&mut self, frame: usize, channel: u16, value: f32) -> Result<(), PcmIndexError> {
        let index = self.index(frame, channel)?;
        let value = value.clamp(-1.0, 1.0);
        match &mut self.samples {
            Samples::U8(data) => data[index] = (U8_NEUTRAL + scale(value, U8_AMPLITUDE)) as u8,
            Samples::I16(data) => data[index] = scale(value, I16_MAX as f64) as i16,
            Samples::I32(data) => data[index] = scale(value, I32_MAX as f64) as i32,
        }
        Ok(())
    }

    /// Add to one sample, saturating at the format's range
    pub fn increment(&mut self, frame: usize, channel: u16, value: f32) -> Result<(), PcmIndexError> {
        let index = self.index(frame, channel)?;
        match &mut self.samples {
            Samples::U8(data) => {
                let sum = data[index] as i64 + scale(value, U8_AMPLITUDE);
                data[index] = sum.clamp(0, 255) as u8;
            }
            Samples::I16(data) => {
                let sum = data[index] as i64 + scale(value, I16_MAX as f64);
                data[index] = sum.clamp(-I16_MAX, I16_MAX) as i16;
            }
            Samples::I32(data) => {
                let sum = data[index] as i64 + scale(value, I32_MAX as f64);
                data[index] = sum.clamp(-I32_MAX, I32_MAX) as i32;
            }
        }
        Ok(())
    }

    /// Read one sample back as a float
    pub fn get(&self, frame: usize, channel: u16) -> Result<f32, PcmIndexError> {
        let index = self.index(frame, channel)?;
        Ok(match &self.samples {
            Samples::U8(data) => ((data[index] as i64 - U8_NEUTRAL) as f64 / U8_AMPLITUDE) as f32,
            Samples::I16(data) => data[index] as f32 / I16_MAX as f32,
            Samples::I32(data) => (data[index] as f64 / I32_MAX as f64) as f32,
        })
    }

    /// Reset every sample to silence
    pub fn clear(&mut self) {
        match &mut self.samples {
            Samples::U8(data) => data.fill(U8_NEUTRAL as u8),
            Samples::I16(data) => data.fill(0),
            Samples::I32(data) => data.fill(0),
        }
    }

    /// Size of the serialized buffer
    pub fn byte_len(&self) -> usize {
        self.frames * self.channels as usize * self.format().bytes() as usize
    }

    /// Serialize little-endian, interleaved by channel within each frame
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        match &self.samples {
            Samples::U8(data) => out.extend_from_slice(data),
            Samples::I16(data) => data.iter().for_each(|s| out.extend_from_slice(&s.to_le_bytes())),
            Samples::I32(data) => data.iter().for_each(|s| out.extend_from_slice(&s.to_le_bytes())),
        }
        out
    }

    pub fn write_le<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }
}

fn scale(value: f32, amplitude: f64) -> i64 {
    (value as f64 * amplitude).round() as i64
}
