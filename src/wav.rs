//! WAV file writer
//!
//! Streams PCM buffers into a RIFF/WAVE container. The 44-byte header is
//! written as a zeroed placeholder when the writer is created and rewritten
//! with the final sizes by [`WavWriter::finalize`], once the total frame
//! count is known.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::pcm::{PcmBuffer, SampleFormat};

/// Size of the canonical PCM header
pub const HEADER_LEN: usize = 44;

/// Stream layout written into the `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub channels: u16,
    pub sample_rate: u32,
    pub format: SampleFormat,
}

impl WavSpec {
    pub fn block_align(&self) -> u16 {
        self.channels * self.format.bytes()
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

/// Write the 44-byte header for `data_size` bytes of samples
///
/// Fails if the sizes do not fit the 32-bit RIFF fields.
pub fn write_header<W: Write>(writer: &mut W, spec: &WavSpec, data_size: u64) -> io::Result<()> {
    let data_size = u32::try_from(data_size)
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "audio data exceeds 4 GiB"))?;
    let file_size = 36 + data_size; // 44 - 8 (header excluding RIFF and size)

    // RIFF chunk
    writer.write_all(b"RIFF")?;
    writer.write_all(&file_size.to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    // fmt subchunk
    writer.write_all(b"fmt ")?;
    writer.write_all(&16u32.to_le_bytes())?; // Subchunk size
    writer.write_all(&1u16.to_le_bytes())?; // Audio format (PCM)
    writer.write_all(&spec.channels.to_le_bytes())?;
    writer.write_all(&spec.sample_rate.to_le_bytes())?;
    writer.write_all(&spec.byte_rate().to_le_bytes())?;
    writer.write_all(&spec.block_align().to_le_bytes())?;
    writer.write_all(&spec.format.bits().to_le_bytes())?;

    // data subchunk
    writer.write_all(b"data")?;
    writer.write_all(&data_size.to_le_bytes())?;
    Ok(())
}

/// Incremental WAV writer over any seekable sink
#[derive(Debug)]
pub struct WavWriter<W: Write + Seek> {
    sink: W,
    spec: WavSpec,
    frames: u64,
}

impl WavWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and reserve the header
    pub fn create<P: AsRef<Path>>(path: P, spec: WavSpec) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), spec)
    }
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(mut sink: W, spec: WavSpec) -> io::Result<Self> {
        sink.write_all(&[0u8; HEADER_LEN])?;
        Ok(Self {
            sink,
            spec,
            frames: 0,
        })
    }

    /// Frames written so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Append one buffer, which must match the writer layout
    pub fn write_buffer(&mut self, buffer: &PcmBuffer) -> io::Result<()> {
        if buffer.channels() != self.spec.channels || buffer.format() != self.spec.format {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "PCM buffer layout does not match the WAV stream",
            ));
        }
        buffer.write_le(&mut self.sink)?;
        self.frames += buffer.frames() as u64;
        Ok(())
    }

    /// Rewrite the header with the final sizes and flush
    pub fn finalize(mut self) -> io::Result<W> {
        let data_size = self.frames * self.spec.block_align() as u64;
        self.sink.seek(SeekFrom::Start(0))?;
        write_header(&mut self.sink, &self.spec, data_size)?;
        self.sink.seek(SeekFrom::End(0))?;
        self.sink.flush()?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    fn u16_at(data: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([data[offset], data[offset + 1]])
    }

    fn u32_at(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
    }

    fn spec(channels: u16, format: SampleFormat) -> WavSpec {
        WavSpec {
            channels,
            sample_rate: 16000,
            format,
        }
    }

    #[test]
    fn test_placeholder_header() {
        let writer = WavWriter::new(Cursor::new(Vec::new()), spec(1, SampleFormat::I16)).unwrap();
        assert_eq!(writer.frames(), 0);
        let data = writer.sink.into_inner();
        assert_eq!(data, vec![0u8; HEADER_LEN]);
    }

    #[test]
    fn test_write_wav_full_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.wav");

        let mut writer = WavWriter::create(&path, spec(2, SampleFormat::I32)).unwrap();
        let mut buffer = PcmBuffer::new(10, 2, SampleFormat::I32);
        buffer.set(0, 0, 1.0).unwrap();
        writer.write_buffer(&buffer).unwrap();
        writer.write_buffer(&buffer).unwrap();
        writer.finalize().unwrap();

        // Read back and verify header
        let data = fs::read(&path).unwrap();
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(&data[8..12], b"WAVE");
        assert_eq!(&data[12..16], b"fmt ");
        assert_eq!(u32_at(&data, 16), 16);
        assert_eq!(u16_at(&data, 20), 1); // PCM format
        assert_eq!(u16_at(&data, 22), 2); // Stereo
        assert_eq!(u32_at(&data, 24), 16000); // Sample rate
        assert_eq!(u32_at(&data, 28), 16000 * 8); // Byte rate
        assert_eq!(u16_at(&data, 32), 8); // Block align
        assert_eq!(u16_at(&data, 34), 32); // Bits per sample
        assert_eq!(&data[36..40], b"data");

        // 20 frames of 2 x 4 bytes
        assert_eq!(u32_at(&data, 40), 160);
        assert_eq!(u32_at(&data, 4), 36 + 160);
        assert_eq!(data.len(), HEADER_LEN + 160);

        // First sample is full scale
        assert_eq!(u32_at(&data, 44), 0x7fff_ffff);
    }

    #[test]
    fn test_write_wav_8bit_silence() {
        let mut writer = WavWriter::new(Cursor::new(Vec::new()), spec(1, SampleFormat::U8)).unwrap();
        writer.write_buffer(&PcmBuffer::new(5, 1, SampleFormat::U8)).unwrap();
        let data = writer.finalize().unwrap().into_inner();

        assert_eq!(u16_at(&data, 34), 8);
        assert_eq!(u32_at(&data, 40), 5);
        assert_eq!(&data[HEADER_LEN..], &[128; 5]);
    }

    #[test]
    fn test_layout_mismatch_rejected() {
        let mut writer = WavWriter::new(Cursor::new(Vec::new()), spec(1, SampleFormat::I16)).unwrap();
        let stereo = PcmBuffer::new(4, 2, SampleFormat::I16);
        assert!(writer.write_buffer(&stereo).is_err());
        let wide = PcmBuffer::new(4, 1, SampleFormat::I32);
        assert!(writer.write_buffer(&wide).is_err());
        assert_eq!(writer.frames(), 0);
    }

    #[test]
    fn test_header_size_overflow() {
        let mut out = Vec::new();
        let result = write_header(&mut out, &spec(1, SampleFormat::I16), u32::MAX as u64);
        assert!(result.is_err());
    }
}
