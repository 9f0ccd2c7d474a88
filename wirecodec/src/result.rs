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

use crate::packet::ProtocolState;

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur while decoding or encoding packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    ///
    /// Contains the error kind and a description of what operation failed.
    IOError {
        /// The kind of I/O error that occurred
        kind: std::io::ErrorKind,
        /// Description of the operation that failed
        operation: String,
    },

    /// A varint carried a continuation flag on its fifth byte.
    MalformedVarint,

    /// The buffer ended before a value was complete.
    TruncatedPacket {
        /// Number of bytes required from the current offset
        needed: usize,
        /// Number of bytes remaining from the current offset
        available: usize,
    },

    /// A length-prefixed string did not hold valid UTF-8.
    InvalidUtf8 {
        /// Offset of the first string byte
        offset: usize,
    },

    /// A length prefix decoded to a negative value.
    NegativeLength(i32),

    /// A frame or string declared a length above the configured limit.
    FrameTooLarge {
        /// Declared length
        length: usize,
        /// Configured maximum
        max: usize,
    },

    /// A packet id that has no meaning in the current protocol state.
    UnexpectedPacketId {
        /// Protocol state the packet arrived in
        state: ProtocolState,
        /// Packet id found in the frame
        id: i32,
    },

    /// A packet carried bytes where its layout allows none.
    UnexpectedPayload {
        /// Packet id
        id: i32,
        /// Number of unexpected bytes
        length: usize,
    },
}

impl CodecError {
    /// Returns `true` if more input could have completed the value.
    pub fn is_truncated(&self) -> bool {
        matches!(self, CodecError::TruncatedPacket { .. })
    }
}

impl std::error::Error for CodecError {}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::IOError { kind, operation } => {
                write!(f, "I/O error during {}: {:?}", operation, kind)
            }
            CodecError::MalformedVarint => write!(f, "varint exceeds 5 bytes"),
            CodecError::TruncatedPacket { needed, available } => {
                write!(
                    f,
                    "truncated packet (needed: {}, available: {})",
                    needed, available
                )
            }
            CodecError::InvalidUtf8 { offset } => {
                write!(f, "invalid UTF-8 in string at offset {}", offset)
            }
            CodecError::NegativeLength(length) => write!(f, "negative length prefix: {}", length),
            CodecError::FrameTooLarge { length, max } => {
                write!(f, "frame of {} bytes exceeds limit of {}", length, max)
            }
            CodecError::UnexpectedPacketId { state, id } => {
                write!(f, "unexpected packet id 0x{:02X} in {} state", id, state)
            }
            CodecError::UnexpectedPayload { id, length } => {
                write!(
                    f,
                    "packet 0x{:02X} carried {} unexpected payload bytes",
                    id, length
                )
            }
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::IOError {
            kind: err.kind(),
            operation: err.to_string(),
        }
    }
}
