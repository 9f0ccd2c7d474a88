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

//! Per-connection handshake state machine
//!
//! [`HandshakeSession`] turns the packets of one connection into replies
//! without doing any I/O, so every branch can be exercised without a
//! socket.
//!
//! ```text
//! Handshaking --LegacyPing------------------------> kick, close
//! Handshaking --Handshake(status)--> Status --StatusRequest--> status
//!                                           --Ping-----------> pong, close
//!                                           --StatusRequest--> close (repeat)
//! Handshaking --Handshake(login|transfer)---------> disconnect, wake
//! Handshaking --Handshake(unknown)----------------> close
//! ```

use crate::{ExchangeOutcome, Result, StatusProfile};
use hibernate_wirecodec::{
    ClientboundPacket, CodecError, Handshake, Intent, ProtocolState, ServerboundPacket,
    consts::{legacy, packet},
};
use std::sync::Arc;

/// What the connection should do after a packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing to send; keep reading
    Continue,
    /// Send the packet and keep reading
    Reply(ClientboundPacket),
    /// Optionally send a last packet, then close
    Finish {
        /// Last packet, if any
        reply: Option<ClientboundPacket>,
        /// How the exchange ended
        outcome: ExchangeOutcome,
    },
}

/// Handshake state of one client connection
#[derive(Debug)]
pub struct HandshakeSession {
    profile: Arc<StatusProfile>,
    state: ProtocolState,
    handshake: Option<Handshake>,
    status_served: bool,
}

impl HandshakeSession {
    /// Create a session answering with `profile`
    pub fn new(profile: Arc<StatusProfile>) -> Self {
        Self {
            profile,
            state: ProtocolState::Handshaking,
            handshake: None,
            status_served: false,
        }
    }

    /// Current protocol state
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Protocol version announced by the client
    pub fn protocol_version(&self) -> Option<i32> {
        self.handshake.as_ref().map(|h| h.protocol_version)
    }

    /// Intent announced by the client
    pub fn intent(&self) -> Option<Intent> {
        self.handshake.as_ref().map(|h| h.intent)
    }

    /// Check if a status document has been sent
    pub fn status_served(&self) -> bool {
        self.status_served
    }

    /// Advance the state machine with one decoded packet
    pub fn handle(&mut self, packet: ServerboundPacket) -> Result<Step> {
        match (self.state, packet) {
            (ProtocolState::Handshaking, ServerboundPacket::LegacyPing) => Ok(Step::Finish {
                reply: Some(ClientboundPacket::LegacyKick),
                outcome: ExchangeOutcome::LegacyPing,
            }),
            (ProtocolState::Handshaking, ServerboundPacket::Handshake(handshake)) => {
                self.on_handshake(handshake)
            }
            // One status document per connection; a repeat is a protocol error.
            (ProtocolState::Status, ServerboundPacket::StatusRequest) if !self.status_served => {
                self.status_served = true;
                Ok(Step::Reply(self.profile.status_packet()?))
            }
            (ProtocolState::Status, ServerboundPacket::Ping(payload)) => Ok(Step::Finish {
                reply: Some(ClientboundPacket::Pong(payload)),
                outcome: ExchangeOutcome::Status { pinged: true },
            }),
            (state, received) => Err(CodecError::UnexpectedPacketId {
                state,
                id: packet_id(&received),
            }
            .into()),
        }
    }

    fn on_handshake(&mut self, handshake: Handshake) -> Result<Step> {
        let intent = handshake.intent;
        tracing::debug!(
            protocol = handshake.protocol_version,
            host = %handshake.display_host(),
            port = handshake.port,
            forge = handshake.is_forge(),
            %intent,
            "Handshake received"
        );
        self.handshake = Some(handshake);
        match intent.next_state() {
            Some(ProtocolState::Status) => {
                self.state = ProtocolState::Status;
                Ok(Step::Continue)
            }
            Some(state) => {
                self.state = state;
                Ok(Step::Finish {
                    reply: Some(self.profile.disconnect_packet()?),
                    outcome: ExchangeOutcome::Join(intent),
                })
            }
            None => Ok(Step::Finish {
                reply: None,
                outcome: ExchangeOutcome::Dropped,
            }),
        }
    }
}

fn packet_id(received: &ServerboundPacket) -> i32 {
    match received {
        ServerboundPacket::LegacyPing => i32::from(legacy::PING),
        ServerboundPacket::Handshake(_) => packet::HANDSHAKE,
        ServerboundPacket::StatusRequest => packet::STATUS_REQUEST,
        ServerboundPacket::Ping(_) => packet::PING,
    }
}
