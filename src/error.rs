//! Error types
//!
//! Parsing, engine and configuration failures each get their own enum so
//! callers can tell a malformed file apart from a broken output device.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Read past the end of an in-memory byte stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unexpected end of data at offset {offset:#x} (wanted {wanted} bytes, {available} left)")]
pub struct StreamError {
    pub offset: usize,
    pub wanted: usize,
    pub available: usize,
}

/// Errors raised while decoding a Standard MIDI File
///
/// Every variant is fatal: the decoder aborts the whole file on the first one.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("could not read input file: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Exhausted(#[from] StreamError),

    #[error("unexpected chunk tag at offset {offset:#x}: expected {expected:?}, found {found:?}")]
    BadMagic {
        offset: usize,
        expected: &'static str,
        found: [u8; 4],
    },

    #[error("unexpected header length {0} (expected 6)")]
    BadHeaderLength(u32),

    #[error("unsupported file format {0}")]
    UnsupportedFormat(u16),

    #[error("SMPTE time division {0:#06x} is not supported")]
    SmpteDivision(u16),

    #[error("time division of zero ticks per quarter note")]
    ZeroDivision,

    #[error("variable-length quantity longer than 4 bytes at offset {offset:#x}")]
    VlqOverflow { offset: usize },

    #[error("unexpected message argument {byte:#04x} at offset {offset:#x}")]
    UnexpectedStatusByte { byte: u8, offset: usize },

    #[error("running status with no preceding channel message (last status {last:#04x}, offset {offset:#x})")]
    RunningStatus { last: u8, offset: usize },

    #[error("unsupported system message {status:#04x} at offset {offset:#x}")]
    UnsupportedSystemMessage { status: u8, offset: usize },

    #[error("unexpected meta event {code:#04x} at offset {offset:#x}")]
    UnknownMetaEvent { code: u8, offset: usize },

    #[error("meta event {code:#04x} has length {found}, expected {expected}")]
    MetaLength { code: u8, expected: usize, found: usize },

    #[error("unexpected end of track #{track}: declared {declared} bytes, consumed {consumed}")]
    TrackLength {
        track: usize,
        declared: u32,
        consumed: usize,
    },
}

/// Errors raised by an output engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("output I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("could not drive device {path}: {source}")]
    Device {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("engine is not open")]
    NotOpen,

    #[error("engine is already open")]
    AlreadyOpen,

    #[error(transparent)]
    Pcm(#[from] PcmIndexError),
}

/// Sample access outside a PCM buffer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("sample {frame}/{channel} is outside a {frames}x{channels} buffer")]
pub struct PcmIndexError {
    pub frame: usize,
    pub channel: u16,
    pub frames: usize,
    pub channels: u16,
}

/// Invalid or incomplete configuration, reported before any parsing starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("no output engine configured (give an output file or buzzer devices)")]
    NoEngine,

    #[error("both an output file and buzzer devices were given; choose one engine")]
    ConflictingEngines,

    #[error("unexpected speed {0} (must be a positive number)")]
    InvalidSpeed(f64),

    #[error("unexpected pitch {0} hz (must be positive)")]
    InvalidPitch(f32),

    #[error("unknown temperament '{0}'")]
    UnknownTemperament(String),

    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),

    #[error("unexpected channels number: {0} (1 to 16)")]
    InvalidChannels(u16),

    #[error("unexpected sample rate: {0} hz (at least 12000)")]
    InvalidSampleRate(u32),

    #[error("unexpected sample size: {0} bits (8, 16 or 32)")]
    InvalidSampleBits(u16),

    #[error("unexpected gain {0}")]
    InvalidGain(f32),

    #[error("empty buzzer device list")]
    NoDevices,
}
