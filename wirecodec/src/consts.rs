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

//! Protocol constants shared by the decoder and encoder.

/// Maximum number of bytes a varint may occupy on the wire.
///
/// Five groups of seven bits cover a full 32-bit value. A fifth byte that
/// still carries the continuation flag is rejected as malformed.
pub const MAX_VARINT_BYTES: usize = 5;

/// Continuation flag of a varint byte.
pub const VARINT_CONTINUE: u8 = 0x80;

/// Data bits of a varint byte.
pub const VARINT_SEGMENT: u8 = 0x7F;

/// Default upper bound on a serverbound frame body.
///
/// A handshake is well under a kilobyte; anything larger than this is not a
/// client probing our status and is dropped before it is buffered.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 32 * 1024;

/// Upper bound on the handshake server address, in bytes.
pub const MAX_SERVER_ADDRESS_LENGTH: usize = 255 * 4;

/// Legacy (pre-netty) server list probe.
pub mod legacy {
    /// Lead byte of a legacy server list ping.
    pub const PING: u8 = 0xFE;
    /// Second byte of a legacy server list ping.
    pub const PING_PAYLOAD: u8 = 0x01;
    /// Third byte of a legacy server list ping (plugin message marker).
    pub const PLUGIN_MESSAGE: u8 = 0xFA;
    /// Lead byte of a legacy kick/disconnect packet.
    pub const KICK: u8 = 0xFF;
    /// Full probe prefix recognised as a legacy ping.
    pub const PROBE: [u8; 3] = [PING, PING_PAYLOAD, PLUGIN_MESSAGE];
}

/// Packet identifiers.
pub mod packet {
    /// Serverbound handshake (handshaking state).
    pub const HANDSHAKE: i32 = 0x00;
    /// Serverbound status request (status state).
    pub const STATUS_REQUEST: i32 = 0x00;
    /// Serverbound ping (status state).
    pub const PING: i32 = 0x01;
    /// Clientbound status response (status state).
    pub const STATUS_RESPONSE: i32 = 0x00;
    /// Clientbound pong (status state).
    pub const PONG: i32 = 0x01;
    /// Clientbound disconnect (login state).
    pub const LOGIN_DISCONNECT: i32 = 0x00;
}

/// Handshake `next_state` codes.
pub mod intent {
    /// Client wants the server list status.
    pub const STATUS: i32 = 1;
    /// Client wants to log in.
    pub const LOGIN: i32 = 2;
    /// Client is being transferred from another server.
    pub const TRANSFER: i32 = 3;
}
