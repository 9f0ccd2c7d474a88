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

//! # Hibernate Wire Codec
//!
//! Codec for the handshake a game client performs when it probes a server
//! for its status or tries to log in. It is the decoding half of a decoy
//! responder: something that answers those probes while the real server
//! process is suspended.
//!
//! ## Wire Format
//!
//! Modern packets are framed as `varint length | body`, and every body
//! starts with a `varint packet_id`. A varint stores seven data bits per
//! byte, least significant group first, with the high bit as continuation
//! flag; at most five bytes are read.
//!
//! ```text
//! Handshake      0x00  varint protocol | string address | u16 port | varint next_state
//! StatusRequest  0x00  (empty)
//! Ping           0x01  i64 payload
//! ```
//!
//! Older clients send an unframed legacy probe, `FE 01 FA ...`, which is
//! answered with `FF 00 00` and a close. The decoder recognises it before
//! any varint framing is attempted.
//!
//! ## Core Components
//!
//! - Framing primitives ([`decode_varint`], [`decode_string`],
//!   [`encode_varint`], [`frame_packet`], ...) are pure functions over a
//!   byte slice and an offset.
//! - [`PacketCodec`] implements [`Decoder`] and [`Encoder`] from
//!   `tokio_util::codec`, tracking the [`ProtocolState`] selected by the
//!   handshake.
//! - [`StatusResponse`] and [`ChatComponent`] model the JSON payloads.
//!
//! ## Usage Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use hibernate_wirecodec::{ClientboundPacket, PacketCodec, ServerboundPacket};
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut codec = PacketCodec::new();
//! let mut input = BytesMut::from(&[0xFE, 0x01, 0xFA][..]);
//! assert_eq!(codec.decode(&mut input).unwrap(), Some(ServerboundPacket::LegacyPing));
//!
//! let mut output = BytesMut::new();
//! codec.encode(ClientboundPacket::LegacyKick, &mut output).unwrap();
//! assert_eq!(&output[..], &[0xFF, 0x00, 0x00]);
//! ```
//!
//! ## Thread Safety
//!
//! `PacketCodec` holds per-connection state; give each connection its own.
//!
//! [`Decoder`]: tokio_util::codec::Decoder
//! [`Encoder`]: tokio_util::codec::Encoder

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

mod codec;
pub mod consts;
mod packet;
mod result;
mod status;
mod wire;

pub use self::codec::PacketCodec;
pub use self::packet::{ClientboundPacket, Handshake, Intent, ProtocolState, ServerboundPacket};
pub use self::result::{CodecError, CodecResult};
pub use self::status::{ChatComponent, PlayerSample, StatusPlayers, StatusResponse, StatusVersion};
pub use self::wire::{
    decode_i64_be, decode_string, decode_string_bounded, decode_u16_be, decode_varint,
    encode_string, encode_varint, frame_packet, varint_len, write_string, write_varint,
};
