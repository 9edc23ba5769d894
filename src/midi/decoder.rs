//! Standard MIDI File decoder
//!
//! Reads the `MThd` header and every `MTrk` chunk, converting delta-times to
//! wall-clock durations with the current tempo and feeding note-on/off
//! messages into a [`Timeline`]. Every other message is parsed for stream
//! integrity and discarded.

use std::fs;
use std::path::Path;
use std::time::Duration;

use super::stream::ByteStream;
use super::vlq;
use crate::error::ParseError;
use crate::pipeline::timeline::{NoteState, Timeline};

/// Tempo in effect before the first set-tempo event (120 bpm)
pub const DEFAULT_TEMPO: u32 = 500_000;

const MTHD: &[u8; 4] = b"MThd";
const MTRK: &[u8; 4] = b"MTrk";
const HEADER_LENGTH: u32 = 6;

/// Parsed `MThd` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiHeader {
    /// 0: single track, 1: simultaneous tracks, 2: independent sequences
    pub format: u16,
    pub tracks: u16,
    pub ticks_per_quarter: u16,
}

/// Result of decoding a single track event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    EndOfTrack,
}

/// Streaming decoder state
///
/// Holds the tempo (microseconds per quarter note) and the last status byte
/// used for running status. Both only change while a file is being decoded.
#[derive(Debug, Clone)]
pub struct MidiDecoder {
    tempo: u32,
    last_status: u8,
    ticks_per_quarter: u16,
}

impl Default for MidiDecoder {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            last_status: 0,
            ticks_per_quarter: 0,
        }
    }
}

impl MidiDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tempo in microseconds per quarter note
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Read and decode a file from disk
    pub fn decode_file(
        &mut self,
        path: impl AsRef<Path>,
        timeline: &mut Timeline,
    ) -> Result<MidiHeader, ParseError> {
        let data = fs::read(path.as_ref())?;
        self.decode(&data, timeline)
    }

    /// Decode a complete file held in memory
    ///
    /// Every track starts at time zero. Format 1 tracks play together and
    /// format 2 tracks are independent sequences, so neither continues from
    /// where the previous track ended.
    pub fn decode(&mut self, data: &[u8], timeline: &mut Timeline) -> Result<MidiHeader, ParseError> {
        *self = Self::default();
        let mut stream = ByteStream::new(data);

        let header = read_header(&mut stream)?;
        self.ticks_per_quarter = header.ticks_per_quarter;
        log::info!(
            "MIDI header: format {}, {} track(s), {} ticks per quarter note",
            header.format,
            header.tracks,
            header.ticks_per_quarter
        );

        for index in 0..header.tracks as usize {
            timeline.rewind();
            if let Err(err) = self.decode_track(index, &mut stream, timeline) {
                log::error!("Could not parse track #{}", index + 1);
                return Err(err);
            }
        }

        log::debug!(
            "Decoded {} note events, final tempo {} us/quarter",
            timeline.len(),
            self.tempo
        );
        Ok(header)
    }

    /// Convert a delta-time in ticks to a duration at the current tempo
    pub fn ticks_to_duration(&self, ticks: u32) -> Duration {
        let micros =
            ticks as u64 * self.tempo as u64 / self.ticks_per_quarter.max(1) as u64;
        Duration::from_micros(micros)
    }

    fn decode_track(
        &mut self,
        index: usize,
        stream: &mut ByteStream<'_>,
        timeline: &mut Timeline,
    ) -> Result<(), ParseError> {
        expect_tag(stream, MTRK)?;
        let declared = stream.read_u32()?;
        log::debug!("Track #{}: {} bytes", index + 1, declared);

        let start = stream.offset();
        while self.decode_event(stream, timeline)? == Step::Continue {}

        let consumed = stream.offset() - start;
        if consumed != declared as usize {
            return Err(ParseError::TrackLength {
                track: index + 1,
                declared,
                consumed,
            });
        }
        log::debug!("Track #{} ends at {} ms", index + 1, timeline.clock().as_millis());
        Ok(())
    }

    fn decode_event(
        &mut self,
        stream: &mut ByteStream<'_>,
        timeline: &mut Timeline,
    ) -> Result<Step, ParseError> {
        let delta = vlq::read(stream)?;
        timeline.advance(self.ticks_to_duration(delta));

        let offset = stream.offset();
        let byte = stream.read_u8()?;

        if byte & 0x80 == 0 {
            // Running status: the byte is the first argument of a repeated message
            if !is_channel_status(self.last_status) {
                return Err(ParseError::RunningStatus {
                    last: self.last_status,
                    offset,
                });
            }
            self.decode_channel_message(self.last_status, byte, stream, timeline)?;
            return Ok(Step::Continue);
        }

        self.last_status = byte;
        if is_channel_status(byte) {
            let first = read_data_byte(stream)?;
            self.decode_channel_message(byte, first, stream, timeline)?;
            Ok(Step::Continue)
        } else {
            self.decode_system_message(byte, offset, stream)
        }
    }

    fn decode_channel_message(
        &mut self,
        status: u8,
        first: u8,
        stream: &mut ByteStream<'_>,
        timeline: &mut Timeline,
    ) -> Result<(), ParseError> {
        let channel = status & 0x0f;
        match status >> 4 {
            0x8 => {
                let velocity = read_data_byte(stream)?;
                log::trace!("ch{:02} note off {} v{}", channel, first, velocity);
                timeline.push(channel, first, velocity, NoteState::Off);
            }
            0x9 => {
                let velocity = read_data_byte(stream)?;
                log::trace!("ch{:02} note on {} v{}", channel, first, velocity);
                let state = if velocity == 0 {
                    NoteState::Off
                } else {
                    NoteState::On
                };
                timeline.push(channel, first, velocity, state);
            }
            // Polyphonic pressure, control change, pitch wheel: two arguments
            0xa | 0xb | 0xe => {
                read_data_byte(stream)?;
            }
            // Program change, channel pressure: one argument
            _ => {}
        }
        Ok(())
    }

    fn decode_system_message(
        &mut self,
        status: u8,
        offset: usize,
        stream: &mut ByteStream<'_>,
    ) -> Result<Step, ParseError> {
        match status {
            0xf0 | 0xf7 => {
                let length = vlq::read(stream)?;
                stream.read_bytes(length as usize)?;
                log::debug!("System exclusive: {} bytes", length);
            }
            // Undefined, no payload
            0xf1 => {}
            // Song position pointer
            0xf2 => {
                read_data_byte(stream)?;
                read_data_byte(stream)?;
            }
            // Song select
            0xf3 => {
                read_data_byte(stream)?;
            }
            0xff => return self.decode_meta_event(stream),
            _ => return Err(ParseError::UnsupportedSystemMessage { status, offset }),
        }
        Ok(Step::Continue)
    }

    fn decode_meta_event(&mut self, stream: &mut ByteStream<'_>) -> Result<Step, ParseError> {
        let offset = stream.offset();
        let code = stream.read_u8()?;
        let length = vlq::read(stream)?;
        let data = stream.read_bytes(length as usize)?;

        match code {
            0x01..=0x0a => {
                log::debug!(
                    "Text event {:#04x}: {:?}",
                    code,
                    String::from_utf8_lossy(data)
                );
            }
            0x20 => {
                expect_meta_length(code, data, 1)?;
                log::debug!("Channel prefix: {}", data[0]);
            }
            0x2f => {
                expect_meta_length(code, data, 0)?;
                log::debug!("End of track");
                return Ok(Step::EndOfTrack);
            }
            0x51 => {
                expect_meta_length(code, data, 3)?;
                self.tempo = u32::from_be_bytes([0, data[0], data[1], data[2]]);
                log::debug!("Set tempo: {} us/quarter", self.tempo);
            }
            0x54 => {
                expect_meta_length(code, data, 5)?;
                log::debug!("SMPTE offset: {:?}", data);
            }
            0x58 => {
                expect_meta_length(code, data, 4)?;
                log::debug!(
                    "Time signature: {}/{} (clocks {}, 32nds {})",
                    data[0],
                    1u32 << data[1].min(31),
                    data[2],
                    data[3]
                );
            }
            0x59 => {
                expect_meta_length(code, data, 2)?;
                log::debug!("Key signature: sf {} mi {}", data[0] as i8, data[1]);
            }
            // Port prefix, sequencer specific
            0x21 | 0x7f => {
                log::debug!("Ignored meta event {:#04x} ({} bytes)", code, length);
            }
            _ => return Err(ParseError::UnknownMetaEvent { code, offset }),
        }
        Ok(Step::Continue)
    }
}

fn read_header(stream: &mut ByteStream<'_>) -> Result<MidiHeader, ParseError> {
    expect_tag(stream, MTHD)?;

    let length = stream.read_u32()?;
    if length != HEADER_LENGTH {
        return Err(ParseError::BadHeaderLength(length));
    }

    let format = stream.read_u16()?;
    let tracks = stream.read_u16()?;
    let division = stream.read_u16()?;

    if format > 2 {
        return Err(ParseError::UnsupportedFormat(format));
    }
    if division & 0x8000 != 0 {
        return Err(ParseError::SmpteDivision(division));
    }
    if division == 0 {
        return Err(ParseError::ZeroDivision);
    }

    Ok(MidiHeader {
        format,
        tracks,
        ticks_per_quarter: division,
    })
}

fn expect_tag(stream: &mut ByteStream<'_>, expected: &'static [u8; 4]) -> Result<(), ParseError> {
    let offset = stream.offset();
    let found = stream.read_tag()?;
    if &found != expected {
        return Err(ParseError::BadMagic {
            offset,
            expected: std::str::from_utf8(expected).unwrap_or("????"),
            found,
        });
    }
    Ok(())
}

fn expect_meta_length(code: u8, data: &[u8], expected: usize) -> Result<(), ParseError> {
    if data.len() != expected {
        return Err(ParseError::MetaLength {
            code,
            expected,
            found: data.len(),
        });
    }
    Ok(())
}

/// Read a message argument, which must have its top bit clear
fn read_data_byte(stream: &mut ByteStream<'_>) -> Result<u8, ParseError> {
    let offset = stream.offset();
    let byte = stream.read_u8()?;
    if byte & 0x80 != 0 {
        return Err(ParseError::UnexpectedStatusByte { byte, offset });
    }
    Ok(byte)
}

fn is_channel_status(status: u8) -> bool {
    status & 0x80 != 0 && status & 0xf0 != 0xf0
}
