/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Error types shared by every layer of Acton Wire.

use std::fmt;

use crate::message::Codec;

/// Errors raised by endpoint configuration, socket management and the actor runtime.
///
/// Resource-affecting variants (`EndpointOpen`, `Lifecycle`) are only returned after the
/// owning [`SocketManager`](crate::SocketManager) has released whatever it had
/// opened. Per-message variants (`Serialization`, `Transport` on a single send) leave the
/// manager usable.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// An endpoint descriptor is malformed or its mode does not fit its pattern/address.
    #[error("invalid endpoint configuration: {reason}")]
    Configuration {
        /// What is wrong with the descriptor.
        reason: String,
    },

    /// An endpoint with the same name is already registered on the manager.
    #[error("endpoint '{name}' is already registered")]
    DuplicateEndpoint {
        /// The conflicting endpoint name.
        name: String,
    },

    /// The endpoint name is not registered, or the manager has not opened it.
    #[error("endpoint '{name}' is not registered or not open")]
    UnknownEndpoint {
        /// The requested endpoint name.
        name: String,
    },

    /// Opening one endpoint failed; every sibling endpoint was closed before this was raised.
    #[error("failed to open endpoint '{name}': {source}")]
    EndpointOpen {
        /// The endpoint that could not be bound or connected.
        name: String,
        /// The transport failure behind it.
        #[source]
        source: TransportError,
    },

    /// Encoding or decoding an event failed.
    #[error("{codec} serialization failed: {reason}")]
    Serialization {
        /// The codec in use.
        codec: Codec,
        /// The codec's error message.
        reason: String,
    },

    /// The transport rejected a send or receive.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An operation was called out of lifecycle order.
    #[error("{subject}: {reason}")]
    Lifecycle {
        /// The manager or runtime that rejected the call.
        subject: String,
        /// Which ordering rule was violated.
        reason: String,
    },

    /// The manager started closing while the operation was suspended.
    #[error("socket manager '{manager}' is closing")]
    Closing {
        /// The manager name.
        manager: String,
    },
}

impl WireError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn lifecycle(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Lifecycle {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors that only affect a single message.
    #[must_use]
    pub const fn is_per_message(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }
}

/// Classification of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// Another socket already holds the address.
    AddressInUse,
    /// The transport could not parse or resolve the address.
    InvalidAddress,
    /// The pattern or operation is not offered by this transport or socket.
    Unsupported,
    /// Connecting did not complete within the configured timeout.
    ConnectTimeout,
    /// The peer went away (connection-oriented patterns).
    PeerGone,
    /// The socket or context was already closed.
    Closed,
    /// A frame sequence could not be turned into a transport message.
    InvalidMessage,
    /// Operating system I/O failure.
    Io,
    /// Anything the transport did not classify.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::AddressInUse => "address in use",
            Self::InvalidAddress => "invalid address",
            Self::Unsupported => "unsupported",
            Self::ConnectTimeout => "connect timeout",
            Self::PeerGone => "peer gone",
            Self::Closed => "closed",
            Self::InvalidMessage => "invalid message",
            Self::Io => "i/o error",
            Self::Other => "transport error",
        };
        f.write_str(text)
    }
}

/// A failure reported by the socket transport.
///
/// Acton Wire never retries on its own; retry policy belongs to the actor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    /// Creates a transport error of the given kind.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an [`TransportErrorKind::Unsupported`] error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unsupported, message)
    }

    /// Shorthand for a [`TransportErrorKind::Closed`] error.
    pub fn closed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Closed, message)
    }

    /// The error classification.
    #[must_use]
    pub const fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// The transport's description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::ErrorKind> for TransportErrorKind {
    fn from(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::AddrInUse => Self::AddressInUse,
            std::io::ErrorKind::AddrNotAvailable => Self::InvalidAddress,
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionRefused => Self::PeerGone,
            std::io::ErrorKind::TimedOut => Self::ConnectTimeout,
            _ => Self::Io,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.kind().into(), err.to_string())
    }
}
