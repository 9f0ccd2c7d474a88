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

//! One client exchange on the decoy responder
//!
//! A [`DecoyConnection`] owns the socket and its read buffer for the
//! lifetime of a single exchange. Every exit path drops it, which closes
//! the socket.

use crate::handshake::{HandshakeSession, Step};
use crate::{ExchangeOutcome, HibernateError, ListenerConfig, Result, StatusProfile};
use futures_util::{SinkExt, StreamExt};
use hibernate_wirecodec::{ClientboundPacket, Intent, PacketCodec};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::Framed;

/// Socket, buffered bytes and handshake state of one client
#[derive(Debug)]
pub struct DecoyConnection<S> {
    framed: Framed<S, PacketCodec>,
    peer_addr: SocketAddr,
    session: HandshakeSession,
    read_timeout: Duration,
    write_timeout: Duration,
    exchange_timeout: Duration,
}

impl<S> DecoyConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an accepted stream
    pub fn new(
        stream: S,
        peer_addr: SocketAddr,
        profile: Arc<StatusProfile>,
        config: &ListenerConfig,
    ) -> Self {
        let codec = PacketCodec::new().with_max_frame_length(config.max_frame_length);
        Self {
            framed: Framed::new(stream, codec),
            peer_addr,
            session: HandshakeSession::new(profile),
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            exchange_timeout: config.exchange_timeout,
        }
    }

    /// Remote address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Protocol version announced in the handshake, if one arrived
    pub fn protocol_version(&self) -> Option<i32> {
        self.session.protocol_version()
    }

    /// Intent announced in the handshake, if one arrived
    pub fn intent(&self) -> Option<Intent> {
        self.session.intent()
    }

    /// Run the exchange to completion and close the connection
    ///
    /// The whole exchange is bounded by the exchange timeout, on top of
    /// the per-packet read and write timeouts. A join outcome is reported
    /// even if the disconnect message could not be delivered: the client
    /// still asked to join.
    #[tracing::instrument(level = "debug", skip(self), fields(peer_addr = %self.peer_addr))]
    pub async fn run(mut self) -> Result<ExchangeOutcome> {
        let bound = self.exchange_timeout;
        match timeout(bound, self.exchange()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(?bound, "Exchange took too long, closing");
                Err(HibernateError::Timeout)
            }
        }
    }

    async fn exchange(&mut self) -> Result<ExchangeOutcome> {
        loop {
            let packet = match timeout(self.read_timeout, self.framed.next()).await {
                Err(_) => return Err(HibernateError::Timeout),
                Ok(None) if self.session.status_served() => {
                    return Ok(ExchangeOutcome::Status { pinged: false });
                }
                Ok(None) => return Err(HibernateError::PeerDisconnected),
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(packet))) => packet,
            };
            tracing::trace!(?packet, "Packet received");

            match self.session.handle(packet)? {
                Step::Continue => {}
                Step::Reply(reply) => self.send(reply).await?,
                Step::Finish { reply, outcome } => {
                    if let Some(reply) = reply {
                        match self.send(reply).await {
                            Ok(()) => {}
                            Err(e) if outcome.wants_wake() => {
                                tracing::debug!(error = %e, "Could not deliver disconnect message");
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    return Ok(outcome);
                }
            }
        }
    }

    async fn send(&mut self, packet: ClientboundPacket) -> Result<()> {
        match timeout(self.write_timeout, self.framed.send(packet)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(HibernateError::Timeout),
        }
    }
}
