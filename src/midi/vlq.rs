//! Variable-length quantities
//!
//! 7 data bits per byte, most significant group first, continuation flag in
//! the top bit. Standard MIDI Files cap the encoding at 4 bytes.

use super::stream::ByteStream;
use crate::error::ParseError;

/// Largest value representable in 4 encoded bytes
pub const VLQ_MAX: u32 = 0x0FFF_FFFF;

const MAX_BYTES: usize = 4;

/// Decode one quantity from the stream
pub fn read(stream: &mut ByteStream<'_>) -> Result<u32, ParseError> {
    let start = stream.offset();
    let mut value = 0u32;
    for _ in 0..MAX_BYTES {
        let byte = stream.read_u8()?;
        value = (value << 7) | (byte & 0x7f) as u32;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ParseError::VlqOverflow { offset: start })
}

/// Encode a value, or `None` if it does not fit in 4 bytes
pub fn encode(value: u32) -> Option<Vec<u8>> {
    if value > VLQ_MAX {
        return None;
    }

    let mut groups = vec![(value & 0x7f) as u8];
    let mut rest = value >> 7;
    while rest > 0 {
        groups.push((rest & 0x7f) as u8 | 0x80);
        rest >>= 7;
    }
    groups.reverse();
    Some(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<u32, ParseError> {
        read(&mut ByteStream::new(bytes))
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(0).unwrap(), vec![0x00]);
        assert_eq!(encode(0x40).unwrap(), vec![0x40]);
        assert_eq!(encode(0x7f).unwrap(), vec![0x7f]);
        assert_eq!(encode(0x80).unwrap(), vec![0x81, 0x00]);
        assert_eq!(encode(0x2000).unwrap(), vec![0xc0, 0x00]);
        assert_eq!(encode(0x1f_ffff).unwrap(), vec![0xff, 0xff, 0x7f]);
        assert_eq!(encode(VLQ_MAX).unwrap(), vec![0xff, 0xff, 0xff, 0x7f]);
        assert!(encode(VLQ_MAX + 1).is_none());
    }

    #[test]
    fn test_round_trip_boundaries() {
        for value in [0, 1, 0x7f, 0x80, 0x3fff, 0x4000, 0x1f_ffff, 0x20_0000, VLQ_MAX] {
            let bytes = encode(value).unwrap();
            assert!(bytes.len() <= 4);
            assert_eq!(decode(&bytes).unwrap(), value, "value {:#x}", value);
        }
    }

    #[test]
    fn test_five_byte_encoding_fails() {
        let err = decode(&[0x81, 0x80, 0x80, 0x80, 0x00]).unwrap_err();
        assert!(matches!(err, ParseError::VlqOverflow { offset: 0 }));
    }

    #[test]
    fn test_truncated_quantity() {
        let err = decode(&[0x81, 0x80]).unwrap_err();
        assert!(matches!(err, ParseError::Exhausted(_)));
    }

    #[test]
    fn test_stream_position_after_read() {
        let data = [0x81, 0x00, 0x05];
        let mut stream = ByteStream::new(&data);
        assert_eq!(read(&mut stream).unwrap(), 0x80);
        assert_eq!(stream.offset(), 2);
        assert_eq!(read(&mut stream).unwrap(), 5);
    }
}
