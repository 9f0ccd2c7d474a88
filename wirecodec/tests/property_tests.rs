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

//! Property tests for the framing primitives

use bytes::BytesMut;
use hibernate_wirecodec::{
    CodecError, PacketCodec, ServerboundPacket, decode_string, decode_varint, encode_string,
    encode_varint, frame_packet, varint_len,
};
use proptest::prelude::*;
use tokio_util::codec::Decoder;

proptest! {
    #[test]
    fn varint_round_trip(value in 0i32..i32::MAX) {
        let encoded = encode_varint(value);
        prop_assert_eq!(decode_varint(&encoded, 0), Ok((value, encoded.len())));
        prop_assert_eq!(varint_len(value), encoded.len());
    }

    #[test]
    fn varint_round_trip_any(value in any::<i32>()) {
        let encoded = encode_varint(value);
        prop_assert!(encoded.len() <= 5);
        prop_assert_eq!(decode_varint(&encoded, 0), Ok((value, encoded.len())));
    }

    #[test]
    fn string_round_trip(value in any::<String>()) {
        let encoded = encode_string(&value);
        prop_assert_eq!(decode_string(&encoded, 0), Ok((value, encoded.len())));
    }

    #[test]
    fn string_round_trip_after_prefix(prefix in proptest::collection::vec(any::<u8>(), 0..16), value in "[a-z\\x00]{0,64}") {
        let mut buffer = prefix.clone();
        buffer.extend_from_slice(&encode_string(&value));
        prop_assert_eq!(decode_string(&buffer, prefix.len()), Ok((value, buffer.len())));
    }

    #[test]
    fn frame_length_prefix_matches_body(body in proptest::collection::vec(any::<u8>(), 0..1024)) {
        let framed = frame_packet(&body);
        let (length, header) = decode_varint(&framed, 0).unwrap();
        prop_assert_eq!(length as usize, body.len());
        prop_assert_eq!(&framed[header..], &body[..]);
    }

    #[test]
    fn decoder_never_panics(input in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut codec = PacketCodec::new();
        let mut buffer = BytesMut::from(&input[..]);
        for _ in 0..8 {
            match codec.decode(&mut buffer) {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }
    }
}

#[test]
fn empty_and_nul_strings() {
    for value in ["", "\0", "a\0b", "\0\0\0"] {
        let encoded = encode_string(value);
        assert_eq!(decode_string(&encoded, 0), Ok((value.to_string(), encoded.len())));
    }
}

#[test]
fn six_continuation_bytes_are_malformed() {
    let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80];
    assert_eq!(decode_varint(&bytes, 0), Err(CodecError::MalformedVarint));

    let mut codec = PacketCodec::new();
    let mut buffer = BytesMut::from(&bytes[..]);
    assert_eq!(codec.decode(&mut buffer), Err(CodecError::MalformedVarint));
    assert_eq!(buffer.len(), bytes.len(), "malformed prefix must not be consumed");
}

#[test]
fn legacy_probe_is_recognised_first() {
    let mut codec = PacketCodec::new();
    let mut buffer = BytesMut::from(&[0xFE, 0x01, 0xFA][..]);
    assert_eq!(codec.decode(&mut buffer), Ok(Some(ServerboundPacket::LegacyPing)));
}
