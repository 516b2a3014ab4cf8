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

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};
use zeromq::{
    DealerSocket, PubSocket, PullSocket, PushSocket, RepSocket, ReqSocket, RouterSocket, Socket,
    SocketRecv, SocketSend, SubSocket, ZmqError, ZmqMessage,
};

use crate::endpoint::Pattern;
use crate::message::{TransportError, TransportErrorKind};
use crate::traits::{Transport, TransportContext, TransportSocket};

/// ZeroMQ transport running on the tokio reactor of the calling task.
///
/// `Pair` sockets are not offered by the underlying library and fail with
/// [`TransportErrorKind::Unsupported`]. Supported schemes are `tcp` and `ipc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZmqTransport;

impl ZmqTransport {
    /// Creates the transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Transport for ZmqTransport {
    fn name(&self) -> &'static str {
        "zeromq"
    }

    fn create_context(&self) -> Result<Box<dyn TransportContext>, TransportError> {
        Ok(Box::new(ZmqContext::default()))
    }
}

/// Bookkeeping for the sockets created on behalf of one manager.
#[derive(Debug, Default)]
struct ZmqContext {
    created: usize,
    terminated: bool,
}

#[async_trait]
impl TransportContext for ZmqContext {
    async fn create_socket(
        &mut self,
        pattern: Pattern,
    ) -> Result<Box<dyn TransportSocket>, TransportError> {
        if self.terminated {
            return Err(TransportError::closed("context already terminated"));
        }
        let inner = match pattern {
            Pattern::Publish => ZmqSocket::Publish(PubSocket::new()),
            Pattern::Subscribe => ZmqSocket::Subscribe(SubSocket::new()),
            Pattern::Push => ZmqSocket::Push(PushSocket::new()),
            Pattern::Pull => ZmqSocket::Pull(PullSocket::new()),
            Pattern::Request => ZmqSocket::Request(ReqSocket::new()),
            Pattern::Reply => ZmqSocket::Reply(RepSocket::new()),
            Pattern::Router => ZmqSocket::Router(RouterSocket::new()),
            Pattern::Dealer => ZmqSocket::Dealer(DealerSocket::new()),
            Pattern::Pair => {
                return Err(TransportError::unsupported(
                    "the zeromq backend has no PAIR socket",
                ))
            }
        };
        self.created += 1;
        trace!(%pattern, created = self.created, "Created zeromq socket");
        Ok(Box::new(ZmqSocketHandle {
            pattern,
            inner: Some(inner),
        }))
    }

    async fn terminate(&mut self) -> Result<(), TransportError> {
        if !self.terminated {
            self.terminated = true;
            debug!(sockets = self.created, "Terminated zeromq context");
        }
        Ok(())
    }
}

enum ZmqSocket {
    Publish(PubSocket),
    Subscribe(SubSocket),
    Push(PushSocket),
    Pull(PullSocket),
    Request(ReqSocket),
    Reply(RepSocket),
    Router(RouterSocket),
    Dealer(DealerSocket),
}

/// Runs `$body` with `$socket` bound to whichever concrete socket `$value` holds.
macro_rules! dispatch {
    ($value:expr, $socket:ident => $body:expr) => {
        match $value {
            ZmqSocket::Publish($socket) => $body,
            ZmqSocket::Subscribe($socket) => $body,
            ZmqSocket::Push($socket) => $body,
            ZmqSocket::Pull($socket) => $body,
            ZmqSocket::Request($socket) => $body,
            ZmqSocket::Reply($socket) => $body,
            ZmqSocket::Router($socket) => $body,
            ZmqSocket::Dealer($socket) => $body,
        }
    };
}

struct ZmqSocketHandle {
    pattern: Pattern,
    inner: Option<ZmqSocket>,
}

impl ZmqSocketHandle {
    fn live(&mut self) -> Result<&mut ZmqSocket, TransportError> {
        let pattern = self.pattern;
        self.inner
            .as_mut()
            .ok_or_else(|| TransportError::closed(format!("{pattern} socket is closed")))
    }
}

fn wrong_direction(pattern: Pattern, operation: &str) -> TransportError {
    TransportError::unsupported(format!("{pattern} sockets cannot {operation}"))
}

#[async_trait]
impl TransportSocket for ZmqSocketHandle {
    async fn bind(&mut self, address: &str) -> Result<String, TransportError> {
        let endpoint = dispatch!(self.live()?, socket => socket.bind(address).await)
            .map_err(classify)?;
        Ok(endpoint.to_string())
    }

    async fn connect(&mut self, address: &str) -> Result<(), TransportError> {
        dispatch!(self.live()?, socket => socket.connect(address).await).map_err(classify)
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let pattern = self.pattern;
        match self.live()? {
            ZmqSocket::Subscribe(socket) => socket.subscribe(topic).await.map_err(classify),
            _ => Err(wrong_direction(pattern, "subscribe")),
        }
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let pattern = self.pattern;
        match self.live()? {
            ZmqSocket::Subscribe(socket) => socket.unsubscribe(topic).await.map_err(classify),
            _ => Err(wrong_direction(pattern, "unsubscribe")),
        }
    }

    async fn send(&mut self, frames: Vec<Bytes>) -> Result<(), TransportError> {
        let message = ZmqMessage::try_from(frames).map_err(|reason| {
            TransportError::new(TransportErrorKind::InvalidMessage, reason.to_string())
        })?;
        let pattern = self.pattern;
        let result = match self.live()? {
            ZmqSocket::Publish(socket) => socket.send(message).await,
            ZmqSocket::Push(socket) => socket.send(message).await,
            ZmqSocket::Request(socket) => socket.send(message).await,
            ZmqSocket::Reply(socket) => socket.send(message).await,
            ZmqSocket::Router(socket) => socket.send(message).await,
            ZmqSocket::Dealer(socket) => socket.send(message).await,
            ZmqSocket::Subscribe(_) | ZmqSocket::Pull(_) => {
                return Err(wrong_direction(pattern, "send"))
            }
        };
        result.map_err(classify)
    }

    async fn recv(&mut self) -> Result<Vec<Bytes>, TransportError> {
        let pattern = self.pattern;
        let result = match self.live()? {
            ZmqSocket::Subscribe(socket) => socket.recv().await,
            ZmqSocket::Pull(socket) => socket.recv().await,
            ZmqSocket::Request(socket) => socket.recv().await,
            ZmqSocket::Reply(socket) => socket.recv().await,
            ZmqSocket::Router(socket) => socket.recv().await,
            ZmqSocket::Dealer(socket) => socket.recv().await,
            ZmqSocket::Publish(_) | ZmqSocket::Push(_) => {
                return Err(wrong_direction(pattern, "receive"))
            }
        };
        result.map(ZmqMessage::into_vec).map_err(classify)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(inner) = self.inner.take() else {
            return Ok(());
        };
        let errors = dispatch!(inner, socket => socket.close().await);
        match errors.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(classify(first)),
        }
    }
}

/// Maps a zeromq error onto the transport taxonomy, preferring the OS error underneath it.
fn classify(err: ZmqError) -> TransportError {
    let message = err.to_string();
    let mut source: Option<&(dyn StdError + 'static)> = Some(&err);
    while let Some(current) = source {
        if let Some(io) = current.downcast_ref::<std::io::Error>() {
            return TransportError::new(io.kind().into(), message);
        }
        source = current.source();
    }

    let lowered = message.to_ascii_lowercase();
    let kind = if lowered.contains("in use") {
        TransportErrorKind::AddressInUse
    } else if lowered.contains("endpoint") || lowered.contains("address") {
        TransportErrorKind::InvalidAddress
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, message)
}
