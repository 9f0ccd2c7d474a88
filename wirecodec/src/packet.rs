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

//! Packet model
//!
//! Serverbound packets are what a probing client sends us; clientbound
//! packets are the replies we synthesize. Only the handful of packets a
//! status probe or a login attempt produces before the server answers are
//! modelled.

use crate::consts::{intent, legacy, packet, MAX_SERVER_ADDRESS_LENGTH};
use crate::wire::{
    decode_i64_be, decode_string_bounded, decode_u16_be, decode_varint, write_string,
    write_varint,
};
use crate::CodecResult;
use bytes::{BufMut, BytesMut};
use std::fmt;

/// Protocol state of a connection, selected by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolState {
    /// Waiting for the handshake (or a legacy probe)
    #[default]
    Handshaking,
    /// Server list status exchange
    Status,
    /// Login attempt
    Login,
    /// Transfer from another server
    Transfer,
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshaking => write!(f, "handshaking"),
            Self::Status => write!(f, "status"),
            Self::Login => write!(f, "login"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

/// Declared intent of a handshake (`next_state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Server list status
    Status,
    /// Login
    Login,
    /// Transfer
    Transfer,
    /// Any other code
    Unknown(i32),
}

impl Intent {
    /// Protocol state the connection moves to after the handshake.
    pub fn next_state(self) -> Option<ProtocolState> {
        match self {
            Intent::Status => Some(ProtocolState::Status),
            Intent::Login => Some(ProtocolState::Login),
            Intent::Transfer => Some(ProtocolState::Transfer),
            Intent::Unknown(_) => None,
        }
    }

    /// Whether the client is trying to join the server.
    pub fn is_join(self) -> bool {
        matches!(self, Intent::Login | Intent::Transfer)
    }
}

impl From<i32> for Intent {
    fn from(code: i32) -> Self {
        match code {
            intent::STATUS => Intent::Status,
            intent::LOGIN => Intent::Login,
            intent::TRANSFER => Intent::Transfer,
            other => Intent::Unknown(other),
        }
    }
}

impl From<Intent> for i32 {
    fn from(value: Intent) -> Self {
        match value {
            Intent::Status => intent::STATUS,
            Intent::Login => intent::LOGIN,
            Intent::Transfer => intent::TRANSFER,
            Intent::Unknown(code) => code,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Status => write!(f, "status"),
            Intent::Login => write!(f, "login"),
            Intent::Transfer => write!(f, "transfer"),
            Intent::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// Handshake sent by every modern client right after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Client protocol version
    pub protocol_version: i32,
    /// Address the client typed, possibly carrying mod-loader markers
    pub server_address: String,
    /// Port the client connected to
    pub port: u16,
    /// What the client wants next
    pub intent: Intent,
}

impl Handshake {
    /// Decodes a handshake body starting just after the packet id.
    ///
    /// `next_state` is read as a varint; the three defined codes occupy a
    /// single byte either way.
    pub fn decode(body: &[u8], offset: usize) -> CodecResult<(Self, usize)> {
        let (protocol_version, offset) = decode_varint(body, offset)?;
        let (server_address, offset) =
            decode_string_bounded(body, offset, MAX_SERVER_ADDRESS_LENGTH)?;
        let (port, offset) = decode_u16_be(body, offset)?;
        let (next_state, offset) = decode_varint(body, offset)?;
        Ok((
            Self {
                protocol_version,
                server_address,
                port,
                intent: Intent::from(next_state),
            },
            offset,
        ))
    }

    /// Appends the handshake body, packet id included.
    pub fn encode_body(&self, dst: &mut BytesMut) {
        write_varint(dst, packet::HANDSHAKE);
        write_varint(dst, self.protocol_version);
        write_string(dst, &self.server_address);
        dst.put_u16(self.port);
        write_varint(dst, i32::from(self.intent));
    }

    /// Host part of the address, without NUL-separated loader markers.
    pub fn host(&self) -> &str {
        self.server_address.split('\0').next().unwrap_or_default()
    }

    /// Whether the address carries a Forge (`FML`) marker.
    pub fn is_forge(&self) -> bool {
        self.server_address
            .split('\0')
            .skip(1)
            .any(|marker| marker.starts_with("FML"))
    }

    /// Host with control characters escaped, safe to put in a log line.
    pub fn display_host(&self) -> String {
        self.host().escape_debug().to_string()
    }
}

/// Packets a client sends to us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerboundPacket {
    /// Legacy `FE 01 FA` server list probe
    LegacyPing,
    /// Modern handshake
    Handshake(Handshake),
    /// Status request (empty body)
    StatusRequest,
    /// Keep-alive ping carrying an opaque payload
    Ping(i64),
}

impl ServerboundPacket {
    /// Appends the packet as it would appear on the wire, framing included.
    pub fn encode(&self, dst: &mut BytesMut) {
        let mut body = BytesMut::new();
        match self {
            ServerboundPacket::LegacyPing => {
                dst.put_slice(&legacy::PROBE);
                return;
            }
            ServerboundPacket::Handshake(handshake) => handshake.encode_body(&mut body),
            ServerboundPacket::StatusRequest => write_varint(&mut body, packet::STATUS_REQUEST),
            ServerboundPacket::Ping(payload) => {
                write_varint(&mut body, packet::PING);
                body.put_i64(*payload);
            }
        }
        write_varint(dst, body.len() as i32);
        dst.put_slice(&body);
    }

    /// Decodes a ping body starting just after the packet id.
    pub(crate) fn decode_ping(body: &[u8], offset: usize) -> CodecResult<Self> {
        let (payload, _) = decode_i64_be(body, offset)?;
        Ok(ServerboundPacket::Ping(payload))
    }
}

/// Packets we send back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientboundPacket {
    /// Legacy kick with an empty reason: `FF 00 00`, written unframed
    LegacyKick,
    /// Status response carrying the JSON status document
    StatusResponse(String),
    /// Echo of a ping payload
    Pong(i64),
    /// Login disconnect carrying a JSON chat component
    Disconnect(String),
}

impl ClientboundPacket {
    /// Packet id, or `None` for the unframed legacy kick.
    pub fn id(&self) -> Option<i32> {
        match self {
            ClientboundPacket::LegacyKick => None,
            ClientboundPacket::StatusResponse(_) => Some(packet::STATUS_RESPONSE),
            ClientboundPacket::Pong(_) => Some(packet::PONG),
            ClientboundPacket::Disconnect(_) => Some(packet::LOGIN_DISCONNECT),
        }
    }

    /// Appends the packet body (id and payload) without the length prefix.
    pub fn encode_body(&self, dst: &mut BytesMut) {
        if let Some(id) = self.id() {
            write_varint(dst, id);
        }
        match self {
            ClientboundPacket::LegacyKick => {
                // Empty UTF-16BE reason: a zero length and nothing else.
                dst.put_u8(legacy::KICK);
                dst.put_u16(0);
            }
            ClientboundPacket::StatusResponse(json) | ClientboundPacket::Disconnect(json) => {
                write_string(dst, json);
            }
            ClientboundPacket::Pong(payload) => dst.put_i64(*payload),
        }
    }
}
