//! Standard MIDI File input
//!
//! - `stream`: big-endian cursor over the file bytes
//! - `vlq`: variable-length quantity helpers
//! - `decoder`: header/track/event decoding into a note timeline

pub mod decoder;
pub mod stream;
pub mod vlq;

pub use decoder::{MidiDecoder, MidiHeader, DEFAULT_TEMPO};
pub use stream::ByteStream;

/// Builders for small in-memory MIDI files used across the test suites
#[cfg(test)]
pub(crate) mod testutil {
    use super::vlq;

    /// Event bytes of one `MTrk` chunk
    #[derive(Debug, Clone, Default)]
    pub struct Track {
        bytes: Vec<u8>,
    }

    impl Track {
        pub fn new() -> Self {
            Self::default()
        }

        fn delta(mut self, ticks: u32) -> Self {
            self.bytes.extend(vlq::encode(ticks).expect("delta fits in 4 bytes"));
            self
        }

        /// Append bytes verbatim (delta-time included by the caller)
        pub fn raw(mut self, bytes: &[u8]) -> Self {
            self.bytes.extend_from_slice(bytes);
            self
        }

        pub fn note_on(self, ticks: u32, channel: u8, note: u8, velocity: u8) -> Self {
            self.delta(ticks).raw(&[0x90 | channel, note, velocity])
        }

        pub fn note_off(self, ticks: u32, channel: u8, note: u8) -> Self {
            self.delta(ticks).raw(&[0x80 | channel, note, 0x40])
        }

        pub fn meta(self, ticks: u32, code: u8, data: &[u8]) -> Self {
            let length = vlq::encode(data.len() as u32).expect("meta length fits");
            self.delta(ticks).raw(&[0xff, code]).raw(&length).raw(data)
        }

        pub fn tempo(self, ticks: u32, micros_per_quarter: u32) -> Self {
            let bytes = micros_per_quarter.to_be_bytes();
            self.meta(ticks, 0x51, &bytes[1..])
        }

        /// Terminate the track with an end-of-track meta event
        pub fn end(self) -> Self {
            self.meta(0, 0x2f, &[])
        }
    }

    /// Assemble a complete file from finished tracks
    pub fn smf(format: u16, division: u16, tracks: &[Track]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"MThd");
        data.extend_from_slice(&6u32.to_be_bytes());
        data.extend_from_slice(&format.to_be_bytes());
        data.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        data.extend_from_slice(&division.to_be_bytes());
        for track in tracks {
            data.extend_from_slice(b"MTrk");
            data.extend_from_slice(&(track.bytes.len() as u32).to_be_bytes());
            data.extend_from_slice(&track.bytes);
        }
        data
    }
}
