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

//! Core types for the hibernation service

use hibernate_wirecodec::Intent;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Lifecycle of the decoy responder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerState {
    /// No socket, no task
    #[default]
    Idle,
    /// Task spawned, socket not bound yet
    Starting,
    /// Socket bound and accepting
    Listening,
    /// Stop requested; the task is winding down
    StopRequested,
}

impl ListenerState {
    /// Check if a responder task exists in this state
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Starting => write!(f, "starting"),
            Self::Listening => write!(f, "listening"),
            Self::StopRequested => write!(f, "stop-requested"),
        }
    }
}

/// Whether the idle countdown is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    /// No countdown pending
    #[default]
    Stopped,
    /// A countdown is pending
    Armed,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Armed => write!(f, "armed"),
        }
    }
}

/// Result of one bounded wait on the listening socket
#[derive(Debug)]
pub enum AcceptOutcome {
    /// A client connected
    Connection(TcpStream, SocketAddr),
    /// Nothing arrived within the accept timeout
    Timeout,
    /// The socket is unusable
    Fatal(io::Error),
}

/// How a single client exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Legacy probe answered with an empty kick
    LegacyPing,
    /// Status served; `pinged` when the keep-alive was echoed too
    Status {
        /// Keep-alive answered before closing
        pinged: bool,
    },
    /// The client wants to join; the real server should be started
    Join(Intent),
    /// Closed without a response (unknown intent)
    Dropped,
}

impl ExchangeOutcome {
    /// Check if this exchange should wake the real server
    pub fn wants_wake(self) -> bool {
        matches!(self, Self::Join(_))
    }
}

impl fmt::Display for ExchangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LegacyPing => write!(f, "legacy-ping"),
            Self::Status { pinged: true } => write!(f, "status+ping"),
            Self::Status { pinged: false } => write!(f, "status"),
            Self::Join(intent) => write!(f, "join({})", intent),
            Self::Dropped => write!(f, "dropped"),
        }
    }
}
