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

//! Error types for the hibernation service

use std::time::Duration;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, HibernateError>;

/// Hibernation service error types
#[derive(Debug, Error)]
pub enum HibernateError {
    /// I/O error from a socket or the filesystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unexpected bytes from a client
    #[error("Protocol error: {0}")]
    Codec(#[from] hibernate_wirecodec::CodecError),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The listening socket could not be bound after every retry
    #[error("Failed to bind {address} after {attempts} attempts: {source}")]
    BindFailure {
        /// Address we tried to bind
        address: String,
        /// Number of attempts made
        attempts: u32,
        /// Error of the last attempt
        source: std::io::Error,
    },

    /// The peer closed the connection before the exchange finished
    #[error("Peer disconnected")]
    PeerDisconnected,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// The player roster could not be obtained from the server
    #[error("Failed to fetch player roster: {0}")]
    RosterFetch(String),

    /// A blacklist entry is not a valid regular expression
    #[error("Invalid blacklist pattern {pattern:?}: {reason}")]
    InvalidBlacklistPattern {
        /// Pattern as configured
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The responder did not stop within the bound and was forcibly closed
    #[error("Responder did not stop within {0:?}")]
    StopTimedOut(Duration),
}

impl HibernateError {
    /// Check if the error is recoverable
    ///
    /// Recoverable errors leave the service in a usable state; the failed
    /// operation can simply be retried later.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HibernateError::Timeout
                | HibernateError::PeerDisconnected
                | HibernateError::Io(_)
                | HibernateError::RosterFetch(_)
        )
    }

    /// Check if the error only concerns a single client connection
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            HibernateError::PeerDisconnected
                | HibernateError::Timeout
                | HibernateError::Io(_)
                | HibernateError::Codec(_)
        )
    }
}
