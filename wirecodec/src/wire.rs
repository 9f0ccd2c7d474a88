//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Framing primitives
//!
//! Pure encode/decode functions over byte slices. Every decoder takes the
//! buffer and an offset and returns the decoded value together with the
//! offset just past it, so callers can walk a packet body without copying.
//! Nothing here performs I/O.

use crate::consts::{MAX_VARINT_BYTES, VARINT_CONTINUE, VARINT_SEGMENT};
use crate::{CodecError, CodecResult};
use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};

/// Decodes a varint starting at `offset`.
///
/// Reads at most five bytes, least significant group first. A fifth byte
/// that still has the continuation flag set yields
/// [`CodecError::MalformedVarint`] and nothing past it is examined.
///
/// # Example
/// ```
/// use hibernate_wirecodec::decode_varint;
///
/// assert_eq!(decode_varint(&[0xAC, 0x02], 0).unwrap(), (300, 2));
/// ```
pub fn decode_varint(bytes: &[u8], offset: usize) -> CodecResult<(i32, usize)> {
    let mut value: u32 = 0;
    for index in 0..MAX_VARINT_BYTES {
        let position = offset + index;
        let Some(&byte) = bytes.get(position) else {
            return Err(CodecError::TruncatedPacket {
                needed: index + 1,
                available: bytes.len().saturating_sub(offset),
            });
        };
        value |= u32::from(byte & VARINT_SEGMENT) << (7 * index);
        if byte & VARINT_CONTINUE == 0 {
            return Ok((value as i32, position + 1));
        }
    }
    Err(CodecError::MalformedVarint)
}

/// Decodes a varint length prefix followed by that many bytes of UTF-8.
pub fn decode_string(bytes: &[u8], offset: usize) -> CodecResult<(String, usize)> {
    let (length, start) = decode_varint(bytes, offset)?;
    let length = usize::try_from(length).map_err(|_| CodecError::NegativeLength(length))?;
    let end = take(bytes, start, length)?;
    let text = std::str::from_utf8(&bytes[start..end])
        .map_err(|_| CodecError::InvalidUtf8 { offset: start })?;
    Ok((text.to_owned(), end))
}

/// Like [`decode_string`], but rejects strings longer than `max` bytes
/// before looking at their contents.
pub fn decode_string_bounded(
    bytes: &[u8],
    offset: usize,
    max: usize,
) -> CodecResult<(String, usize)> {
    let (length, _) = decode_varint(bytes, offset)?;
    if let Ok(length) = usize::try_from(length) {
        if length > max {
            return Err(CodecError::FrameTooLarge { length, max });
        }
    }
    decode_string(bytes, offset)
}

/// Decodes a big-endian `u16`.
pub fn decode_u16_be(bytes: &[u8], offset: usize) -> CodecResult<(u16, usize)> {
    let end = take(bytes, offset, 2)?;
    Ok((BigEndian::read_u16(&bytes[offset..end]), end))
}

/// Decodes a big-endian `i64`.
pub fn decode_i64_be(bytes: &[u8], offset: usize) -> CodecResult<(i64, usize)> {
    let end = take(bytes, offset, 8)?;
    Ok((BigEndian::read_i64(&bytes[offset..end]), end))
}

/// Number of bytes `value` occupies as a varint.
pub fn varint_len(value: i32) -> usize {
    let mut value = value as u32;
    let mut length = 1;
    while value >= u32::from(VARINT_CONTINUE) {
        value >>= 7;
        length += 1;
    }
    length
}

/// Appends `value` as a varint.
pub fn write_varint(dst: &mut BytesMut, value: i32) {
    let mut value = value as u32;
    loop {
        let segment = (value & u32::from(VARINT_SEGMENT)) as u8;
        value >>= 7;
        if value == 0 {
            dst.put_u8(segment);
            break;
        }
        dst.put_u8(segment | VARINT_CONTINUE);
    }
}

/// Appends `value` as a varint length prefix followed by its UTF-8 bytes.
pub fn write_string(dst: &mut BytesMut, value: &str) {
    // Lengths above i32::MAX cannot be expressed on the wire; callers never
    // produce payloads of that size.
    write_varint(dst, value.len() as i32);
    dst.put_slice(value.as_bytes());
}

/// Encodes `value` as a varint.
pub fn encode_varint(value: i32) -> Bytes {
    let mut dst = BytesMut::with_capacity(varint_len(value));
    write_varint(&mut dst, value);
    dst.freeze()
}

/// Encodes `value` as a length-prefixed UTF-8 string.
pub fn encode_string(value: &str) -> Bytes {
    let mut dst = BytesMut::with_capacity(varint_len(value.len() as i32) + value.len());
    write_string(&mut dst, value);
    dst.freeze()
}

/// Prefixes `body` with its own varint-encoded length.
///
/// This is the framing of every modern-protocol packet.
pub fn frame_packet(body: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(varint_len(body.len() as i32) + body.len());
    write_varint(&mut dst, body.len() as i32);
    dst.put_slice(body);
    dst.freeze()
}

/// Bounds check for `length` bytes at `offset`, returning the end offset.
fn take(bytes: &[u8], offset: usize, length: usize) -> CodecResult<usize> {
    let available = bytes.len().saturating_sub(offset);
    if available < length {
        return Err(CodecError::TruncatedPacket {
            needed: length,
            available,
        });
    }
    Ok(offset + length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_known_values() {
        assert_eq!(&encode_varint(0)[..], &[0x00]);
        assert_eq!(&encode_varint(1)[..], &[0x01]);
        assert_eq!(&encode_varint(127)[..], &[0x7F]);
        assert_eq!(&encode_varint(128)[..], &[0x80, 0x01]);
        assert_eq!(&encode_varint(255)[..], &[0xFF, 0x01]);
        assert_eq!(&encode_varint(25565)[..], &[0xDD, 0xC7, 0x01]);
        assert_eq!(&encode_varint(2_147_483_647)[..], &[0xFF, 0xFF, 0xFF, 0xFF, 0x07]);
        assert_eq!(&encode_varint(-1)[..], &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn varint_decode_at_offset() {
        let bytes = [0xAA, 0xDD, 0xC7, 0x01, 0x05];
        assert_eq!(decode_varint(&bytes, 1).unwrap(), (25565, 4));
        assert_eq!(decode_varint(&bytes, 4).unwrap(), (5, 5));
    }

    #[test]
    fn varint_negative_round_trip() {
        let encoded = encode_varint(-2_147_483_648);
        assert_eq!(encoded.len(), 5);
        assert_eq!(decode_varint(&encoded, 0).unwrap(), (-2_147_483_648, 5));
    }

    #[test]
    fn varint_sixth_byte_is_malformed() {
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(decode_varint(&bytes, 0), Err(CodecError::MalformedVarint));
    }

    #[test]
    fn varint_truncated() {
        let err = decode_varint(&[0x80, 0x80], 0).unwrap_err();
        assert!(err.is_truncated());
        assert!(decode_varint(&[], 0).unwrap_err().is_truncated());
    }

    #[test]
    fn varint_len_matches_encoding() {
        for value in [0, 1, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, i32::MAX, -1] {
            assert_eq!(varint_len(value), encode_varint(value).len(), "value {}", value);
        }
    }

    #[test]
    fn string_decode() {
        let mut buffer = BytesMut::new();
        write_string(&mut buffer, "localhost");
        buffer.put_u16(25565);
        let (host, offset) = decode_string(&buffer, 0).unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(decode_u16_be(&buffer, offset).unwrap(), (25565, offset + 2));
    }

    #[test]
    fn string_truncated() {
        let bytes = [0x05, b'a', b'b'];
        assert_eq!(
            decode_string(&bytes, 0),
            Err(CodecError::TruncatedPacket {
                needed: 5,
                available: 2
            })
        );
    }

    #[test]
    fn string_invalid_utf8() {
        let bytes = [0x02, 0xC3, 0x28];
        assert_eq!(
            decode_string(&bytes, 0),
            Err(CodecError::InvalidUtf8 { offset: 1 })
        );
    }

    #[test]
    fn string_negative_length() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        assert_eq!(decode_string(&bytes, 0), Err(CodecError::NegativeLength(-1)));
    }

    #[test]
    fn string_bounded_rejects_before_reading() {
        let encoded = encode_string("a very long server address");
        assert_eq!(
            decode_string_bounded(&encoded, 0, 4),
            Err(CodecError::FrameTooLarge { length: 26, max: 4 })
        );
    }

    #[test]
    fn fixed_width_integers() {
        let bytes = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02];
        assert_eq!(decode_i64_be(&bytes, 0).unwrap(), (258, 8));
        assert!(decode_i64_be(&bytes, 1).unwrap_err().is_truncated());
        assert!(decode_u16_be(&[0x01], 0).unwrap_err().is_truncated());
    }

    #[test]
    fn frame_prefixes_length() {
        let framed = frame_packet(&[0x01, 0x02, 0x03]);
        assert_eq!(&framed[..], &[0x03, 0x01, 0x02, 0x03]);

        let large = vec![0u8; 300];
        let framed = frame_packet(&large);
        assert_eq!(&framed[..2], &[0xAC, 0x02]);
        assert_eq!(framed.len(), 302);
    }
}
