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

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::endpoint::Pattern;
use crate::message::TransportError;

/// Factory for transport contexts.
///
/// A [`SocketManager`](crate::SocketManager) holds one `Transport` and asks it for
/// exactly one context the first time it opens its sockets. Implementations wrap an external
/// socket library; the crate ships [`ZmqTransport`](crate::transport::ZmqTransport).
pub trait Transport: Send + Sync + Debug {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Creates a fresh context. Contexts are never shared between managers or processes.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the underlying library cannot allocate a context.
    fn create_context(&self) -> Result<Box<dyn TransportContext>, TransportError>;
}

/// Owner of the sockets created for one manager.
#[async_trait]
pub trait TransportContext: Send {
    /// Creates an unconnected socket of the given pattern.
    ///
    /// # Errors
    ///
    /// Returns [`TransportErrorKind::Unsupported`](crate::TransportErrorKind::Unsupported)
    /// if the transport does not offer the pattern.
    async fn create_socket(
        &mut self,
        pattern: Pattern,
    ) -> Result<Box<dyn TransportSocket>, TransportError>;

    /// Releases the context. Called once, after every socket it created has been closed.
    async fn terminate(&mut self) -> Result<(), TransportError>;
}

/// One live socket.
///
/// Messages are multipart: a sequence of frames sent and received atomically.
#[async_trait]
pub trait TransportSocket: Send {
    /// Binds to `address` and returns the resolved address (wildcard ports filled in).
    async fn bind(&mut self, address: &str) -> Result<String, TransportError>;

    /// Connects to `address`.
    async fn connect(&mut self, address: &str) -> Result<(), TransportError>;

    /// Adds a topic prefix filter. Only meaningful for subscribe sockets.
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Removes a topic prefix filter.
    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Sends one multipart message, suspending under backpressure.
    async fn send(&mut self, frames: Vec<Bytes>) -> Result<(), TransportError>;

    /// Receives one multipart message.
    async fn recv(&mut self) -> Result<Vec<Bytes>, TransportError>;

    /// Closes the socket. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;
}
