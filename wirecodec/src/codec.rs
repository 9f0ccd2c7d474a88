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

use crate::consts::{legacy, packet, DEFAULT_MAX_FRAME_LENGTH};
use crate::packet::{ClientboundPacket, Handshake, ProtocolState, ServerboundPacket};
use crate::wire::{decode_varint, write_varint};
use crate::{CodecError, CodecResult};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

/// A codec for the server side of the status and login handshake.
///
/// `PacketCodec` decodes [`ServerboundPacket`]s and encodes
/// [`ClientboundPacket`]s. It tracks the protocol state itself: a decoded
/// handshake moves it to the state its intent selects, which changes how
/// the following frames are interpreted.
///
/// Before any varint framing is attempted in the handshaking state, the
/// buffer is checked for the legacy `FE 01 FA` probe, which has no length
/// prefix. The remainder of a legacy probe is discarded since the only
/// reply to it closes the connection.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    state: ProtocolState,
    max_frame_length: usize,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self {
            state: ProtocolState::Handshaking,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl PacketCodec {
    /// Creates a codec in the handshaking state.
    ///
    /// # Example
    /// ```
    /// use hibernate_wirecodec::{PacketCodec, ProtocolState};
    ///
    /// let codec = PacketCodec::new();
    /// assert_eq!(codec.state(), ProtocolState::Handshaking);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest frame body the decoder will buffer.
    pub fn with_max_frame_length(mut self, max: usize) -> Self {
        self.max_frame_length = max;
        self
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Overrides the protocol state.
    pub fn set_state(&mut self, state: ProtocolState) {
        self.state = state;
    }

    /// Largest frame body accepted.
    pub fn max_frame_length(&self) -> usize {
        self.max_frame_length
    }

    /// Checks for the legacy probe.
    ///
    /// Returns `Some(true)` for a complete probe, `Some(false)` when the
    /// bytes seen so far are a prefix of it, and `None` when they are not.
    fn legacy_probe(&self, src: &[u8]) -> Option<bool> {
        if self.state != ProtocolState::Handshaking || src.first() != Some(&legacy::PING) {
            return None;
        }
        let seen = src.len().min(legacy::PROBE.len());
        if src[..seen] != legacy::PROBE[..seen] {
            return None;
        }
        Some(seen == legacy::PROBE.len())
    }

    /// Interprets one complete frame body according to the current state.
    fn decode_body(&mut self, body: &[u8]) -> CodecResult<ServerboundPacket> {
        let (id, offset) = decode_varint(body, 0)?;
        match (self.state, id) {
            (ProtocolState::Handshaking, packet::HANDSHAKE) => {
                let (handshake, _) = Handshake::decode(body, offset)?;
                if let Some(next) = handshake.intent.next_state() {
                    self.state = next;
                }
                Ok(ServerboundPacket::Handshake(handshake))
            }
            (ProtocolState::Status, packet::STATUS_REQUEST) => {
                let trailing = body.len() - offset;
                if trailing != 0 {
                    return Err(CodecError::UnexpectedPayload {
                        id,
                        length: trailing,
                    });
                }
                Ok(ServerboundPacket::StatusRequest)
            }
            (ProtocolState::Status, packet::PING) => ServerboundPacket::decode_ping(body, offset),
            (state, id) => Err(CodecError::UnexpectedPacketId { state, id }),
        }
    }
}

impl Decoder for PacketCodec {
    type Item = ServerboundPacket;
    type Error = CodecError;

    /// Decodes at most one packet from `src`.
    ///
    /// # Returns
    /// - `Ok(Some(packet))`: a complete packet was consumed from `src`.
    /// - `Ok(None)`: `src` holds an incomplete frame; nothing was consumed.
    /// - `Err(CodecError)`: the input can never form a valid packet. The
    ///   connection should be dropped.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        match self.legacy_probe(src) {
            Some(true) => {
                debug!(buffered = src.len(), "Legacy server list probe");
                src.clear();
                return Ok(Some(ServerboundPacket::LegacyPing));
            }
            Some(false) => return Ok(None),
            None => {}
        }

        let (length, header) = match decode_varint(src, 0) {
            Ok(prefix) => prefix,
            Err(err) if err.is_truncated() => return Ok(None),
            Err(err) => return Err(err),
        };
        let length = usize::try_from(length).map_err(|_| CodecError::NegativeLength(length))?;
        if length > self.max_frame_length {
            return Err(CodecError::FrameTooLarge {
                length,
                max: self.max_frame_length,
            });
        }

        let total = header + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total);
        trace!(length, state = %self.state, "Decoding frame");
        self.decode_body(&frame[header..]).map(Some)
    }
}

impl Encoder<ClientboundPacket> for PacketCodec {
    type Error = CodecError;

    /// Encodes a packet, adding the varint length prefix to every packet
    /// except the legacy kick.
    fn encode(&mut self, item: ClientboundPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut body = BytesMut::new();
        item.encode_body(&mut body);
        if item.id().is_some() {
            dst.reserve(body.len() + 5);
            write_varint(dst, body.len() as i32);
        }
        dst.put_slice(&body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Intent;

    fn handshake_bytes(intent: Intent) -> BytesMut {
        let mut buffer = BytesMut::new();
        ServerboundPacket::Handshake(Handshake {
            protocol_version: 767,
            server_address: "localhost".to_string(),
            port: 25565,
            intent,
        })
        .encode(&mut buffer);
        buffer
    }

    #[test]
    fn decode_legacy_probe() {
        let mut codec = PacketCodec::new();
        let mut input = BytesMut::from(&[0xFE, 0x01, 0xFA, 0x00, 0x0B, 0x00, 0x4D][..]);
        assert_eq!(
            codec.decode(&mut input).unwrap(),
            Some(ServerboundPacket::LegacyPing)
        );
        assert!(input.is_empty());
    }

    #[test]
    fn decode_partial_legacy_probe_waits() {
        let mut codec = PacketCodec::new();
        let mut input = BytesMut::from(&[0xFE, 0x01][..]);
        assert_eq!(codec.decode(&mut input).unwrap(), None);
        assert_eq!(input.len(), 2);
        input.extend_from_slice(&[0xFA]);
        assert_eq!(
            codec.decode(&mut input).unwrap(),
            Some(ServerboundPacket::LegacyPing)
        );
    }

    #[test]
    fn legacy_lead_byte_outside_handshaking_is_framing() {
        let mut codec = PacketCodec::new();
        codec.set_state(ProtocolState::Status);
        let mut input = BytesMut::from(&[0xFE, 0x01, 0xFA][..]);
        // 0xFE 0x01 is a varint length of 254; wait for the body.
        assert_eq!(codec.decode(&mut input).unwrap(), None);
    }

    #[test]
    fn decode_handshake_moves_state() {
        let mut codec = PacketCodec::new();
        let mut input = handshake_bytes(Intent::Status);
        let packet = codec.decode(&mut input).unwrap().unwrap();
        assert!(matches!(packet, ServerboundPacket::Handshake(ref h) if h.intent == Intent::Status));
        assert_eq!(codec.state(), ProtocolState::Status);

        let mut input = handshake_bytes(Intent::Login);
        let mut codec = PacketCodec::new();
        codec.decode(&mut input).unwrap();
        assert_eq!(codec.state(), ProtocolState::Login);
    }

    #[test]
    fn decode_unknown_intent_stays_handshaking() {
        let mut codec = PacketCodec::new();
        let mut input = handshake_bytes(Intent::Unknown(9));
        codec.decode(&mut input).unwrap();
        assert_eq!(codec.state(), ProtocolState::Handshaking);
    }

    #[test]
    fn decode_pipelined_handshake_and_request() {
        let mut codec = PacketCodec::new();
        let mut input = handshake_bytes(Intent::Status);
        ServerboundPacket::StatusRequest.encode(&mut input);
        ServerboundPacket::Ping(42).encode(&mut input);

        assert!(matches!(
            codec.decode(&mut input).unwrap(),
            Some(ServerboundPacket::Handshake(_))
        ));
        assert_eq!(
            codec.decode(&mut input).unwrap(),
            Some(ServerboundPacket::StatusRequest)
        );
        assert_eq!(
            codec.decode(&mut input).unwrap(),
            Some(ServerboundPacket::Ping(42))
        );
        assert_eq!(codec.decode(&mut input).unwrap(), None);
    }

    #[test]
    fn decode_partial_frame_waits() {
        let mut codec = PacketCodec::new();
        let full = handshake_bytes(Intent::Status);
        let mut input = BytesMut::from(&full[..4]);
        assert_eq!(codec.decode(&mut input).unwrap(), None);
        input.extend_from_slice(&full[4..]);
        assert!(codec.decode(&mut input).unwrap().is_some());
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let mut codec = PacketCodec::new().with_max_frame_length(16);
        let mut input = BytesMut::from(&[0x20, 0x00][..]);
        assert_eq!(
            codec.decode(&mut input),
            Err(CodecError::FrameTooLarge { length: 32, max: 16 })
        );
    }

    #[test]
    fn decode_rejects_malformed_length() {
        let mut codec = PacketCodec::new();
        let mut input = BytesMut::from(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80][..]);
        assert_eq!(codec.decode(&mut input), Err(CodecError::MalformedVarint));
    }

    #[test]
    fn decode_unexpected_packet_id() {
        let mut codec = PacketCodec::new();
        let mut input = BytesMut::from(&[0x01, 0x05][..]);
        assert_eq!(
            codec.decode(&mut input),
            Err(CodecError::UnexpectedPacketId {
                state: ProtocolState::Handshaking,
                id: 5
            })
        );
    }

    #[test]
    fn decode_status_request_with_payload_is_rejected() {
        let mut codec = PacketCodec::new();
        codec.set_state(ProtocolState::Status);
        let mut input = BytesMut::from(&[0x02, 0x00, 0x07][..]);
        assert_eq!(
            codec.decode(&mut input),
            Err(CodecError::UnexpectedPayload { id: 0, length: 1 })
        );
    }

    #[test]
    fn encode_framed_packets() {
        let mut codec = PacketCodec::new();
        let mut output = BytesMut::new();
        codec
            .encode(ClientboundPacket::Disconnect("{}".to_string()), &mut output)
            .unwrap();
        assert_eq!(&output[..], &[0x04, 0x00, 0x02, b'{', b'}']);

        let mut output = BytesMut::new();
        codec.encode(ClientboundPacket::Pong(-1), &mut output).unwrap();
        assert_eq!(output[0], 0x09);
        assert_eq!(output[1], 0x01);
        assert_eq!(&output[2..], &[0xFF; 8]);
    }

    #[test]
    fn encode_legacy_kick_unframed() {
        let mut codec = PacketCodec::new();
        let mut output = BytesMut::new();
        codec.encode(ClientboundPacket::LegacyKick, &mut output).unwrap();
        assert_eq!(&output[..], &[0xFF, 0x00, 0x00]);
    }
}
