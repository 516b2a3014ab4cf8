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

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::common::config::SocketsConfig;
use crate::endpoint::{EndpointDescriptor, EndpointHandle, Mode, Pattern};
use crate::message::{Codec, Envelope, Event, TransportError, TransportErrorKind, WireError};
use crate::traits::{Transport, TransportContext, TransportSocket};

/// Lifecycle of a [`SocketManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerState {
    /// Accepting registrations; nothing is open.
    Registered,
    /// Every registered endpoint has a live socket.
    Open,
    /// Sockets and context released. Terminal.
    Closed,
}

struct LiveSocket {
    pattern: Pattern,
    socket: Box<dyn TransportSocket>,
    bound_address: Option<String>,
    subscriptions: Vec<String>,
}

/// Owns the messaging context and every socket of one actor.
///
/// Endpoints are registered first, then opened together with [`open_all`](Self::open_all).
/// Opening is all-or-nothing: if one endpoint fails, everything opened before it is closed
/// again and the manager ends up [`Closed`](ManagerState::Closed). [`close_all`](Self::close_all)
/// is idempotent and never fails.
///
/// A manager is owned by exactly one actor and is not `Clone`; its context is never shared.
///
/// # Example
///
/// ```rust,no_run
/// use acton_wire::prelude::*;
///
/// # async fn demo() -> Result<(), WireError> {
/// let mut sockets = SocketManager::new("prices", ZmqTransport::new());
/// sockets.register(EndpointDescriptor::bind("out", Pattern::Publish, "tcp://127.0.0.1:5555")?)?;
/// sockets.open_all().await?;
/// sockets.send("out", &42_u32).await?;
/// sockets.close_all().await;
/// # Ok(())
/// # }
/// ```
pub struct SocketManager {
    name: String,
    transport: Arc<dyn Transport>,
    codec: Codec,
    connect_timeout: Duration,
    descriptors: Vec<EndpointDescriptor>,
    context: Option<Box<dyn TransportContext>>,
    sockets: HashMap<String, LiveSocket>,
    open_order: Vec<String>,
    state: ManagerState,
    closing: CancellationToken,
}

impl SocketManager {
    /// Creates an empty manager using the default [`SocketsConfig`].
    pub fn new(name: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self::from_config(name, transport, &SocketsConfig::default())
    }

    /// Creates an empty manager with codec and connect timeout taken from `config`.
    pub fn from_config(
        name: impl Into<String>,
        transport: impl Transport + 'static,
        config: &SocketsConfig,
    ) -> Self {
        Self {
            name: name.into(),
            transport: Arc::new(transport),
            codec: config.codec,
            connect_timeout: config.connect_timeout(),
            descriptors: Vec::new(),
            context: None,
            sockets: HashMap::new(),
            open_order: Vec::new(),
            state: ManagerState::Registered,
            closing: CancellationToken::new(),
        }
    }

    /// Sets the codec used by `send`/`receive`.
    #[must_use]
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the upper bound for each connect performed by `open_all`.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Records an endpoint to be opened later. Performs no I/O.
    ///
    /// # Errors
    ///
    /// [`WireError::DuplicateEndpoint`] if the name is taken, [`WireError::Lifecycle`] once
    /// `open_all` has been called.
    pub fn register(
        &mut self,
        descriptor: EndpointDescriptor,
    ) -> Result<EndpointHandle, WireError> {
        if self.state != ManagerState::Registered {
            return Err(WireError::lifecycle(
                self.subject(),
                "endpoints cannot be registered after open_all",
            ));
        }
        if self.descriptors.iter().any(|d| d.name() == descriptor.name()) {
            return Err(WireError::DuplicateEndpoint {
                name: descriptor.name().to_string(),
            });
        }
        let handle = EndpointHandle::new(&self.name, descriptor.name(), self.descriptors.len());
        debug!(manager = %self.name, endpoint = %descriptor, "Registered endpoint");
        self.descriptors.push(descriptor);
        Ok(handle)
    }

    /// Opens every registered endpoint in registration order.
    ///
    /// Binds or connects each socket according to its mode, then applies subscriptions.
    /// With no registered endpoints the manager becomes open without creating a context.
    ///
    /// # Errors
    ///
    /// [`WireError::Lifecycle`] if called twice. [`WireError::EndpointOpen`] naming the first
    /// endpoint that failed; by then every socket opened so far has been closed in reverse
    /// order, the context terminated and the manager is closed.
    #[instrument(skip(self), fields(manager = %self.name))]
    pub async fn open_all(&mut self) -> Result<(), WireError> {
        match self.state {
            ManagerState::Registered => {}
            ManagerState::Open => {
                return Err(WireError::lifecycle(self.subject(), "open_all was already called"));
            }
            ManagerState::Closed => {
                return Err(WireError::lifecycle(self.subject(), "manager is closed"));
            }
        }

        if self.descriptors.is_empty() {
            trace!("No endpoints registered, nothing to open");
            self.state = ManagerState::Open;
            return Ok(());
        }

        let mut context = match self.transport.create_context() {
            Ok(context) => context,
            Err(e) => {
                self.state = ManagerState::Closed;
                return Err(e.into());
            }
        };
        debug!(transport = self.transport.name(), "Created transport context");

        let descriptors = self.descriptors.clone();
        for descriptor in &descriptors {
            match open_endpoint(context.as_mut(), descriptor, self.connect_timeout).await {
                Ok(live) => {
                    debug!(
                        endpoint = descriptor.name(),
                        address = live.bound_address.as_deref().unwrap_or(descriptor.address()),
                        mode = %descriptor.mode(),
                        "Opened endpoint"
                    );
                    self.open_order.push(descriptor.name().to_string());
                    self.sockets.insert(descriptor.name().to_string(), live);
                }
                Err(source) => {
                    warn!(
                        endpoint = descriptor.name(),
                        error = %source,
                        opened = self.open_order.len(),
                        "Failed to open endpoint, rolling back"
                    );
                    self.context = Some(context);
                    self.closing.cancel();
                    self.release().await;
                    self.state = ManagerState::Closed;
                    return Err(WireError::EndpointOpen {
                        name: descriptor.name().to_string(),
                        source,
                    });
                }
            }
        }

        self.context = Some(context);
        self.state = ManagerState::Open;
        Ok(())
    }

    /// Encodes `payload` with the manager codec and sends it on endpoint `name`.
    ///
    /// Publish endpoints send it on the empty topic.
    ///
    /// # Errors
    ///
    /// [`WireError::UnknownEndpoint`], [`WireError::Serialization`] (nothing is sent),
    /// [`WireError::Transport`], or [`WireError::Closing`] if the manager starts closing while
    /// the send is suspended.
    pub async fn send<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        payload: &T,
    ) -> Result<(), WireError> {
        self.ensure_live(name)?;
        let bytes = self.codec.encode(payload)?;
        self.transmit(name, Envelope::empty(), bytes).await
    }

    /// Sends an [`Event`], keeping its envelope frames in front of the encoded payload.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send).
    pub async fn send_event<T: Serialize>(
        &mut self,
        name: &str,
        event: Event<T>,
    ) -> Result<(), WireError> {
        self.ensure_live(name)?;
        let bytes = self.codec.encode(&event.payload)?;
        self.transmit(name, event.envelope, bytes).await
    }

    /// Sends an already encoded payload.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), minus serialization.
    pub async fn send_bytes(
        &mut self,
        name: &str,
        envelope: Envelope,
        payload: impl Into<Bytes>,
    ) -> Result<(), WireError> {
        self.transmit(name, envelope, payload.into()).await
    }

    /// Waits for the next message on endpoint `name` and decodes its payload.
    ///
    /// # Errors
    ///
    /// [`WireError::UnknownEndpoint`] immediately if `name` is not open.
    /// [`WireError::Serialization`] if the payload does not decode; that message is dropped and
    /// the next call moves on. [`WireError::Closing`] once the manager starts closing.
    pub async fn receive<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, WireError> {
        self.receive_event(name).await.map(Event::into_payload)
    }

    /// Like [`receive`](Self::receive), keeping the envelope (topic, peer identity).
    ///
    /// # Errors
    ///
    /// As [`receive`](Self::receive).
    pub async fn receive_event<T: DeserializeOwned>(
        &mut self,
        name: &str,
    ) -> Result<Event<T>, WireError> {
        let (envelope, payload) = self.receive_bytes(name).await?;
        match self.codec.decode(&payload) {
            Ok(payload) => Ok(Event { envelope, payload }),
            Err(e) => {
                warn!(
                    manager = %self.name,
                    endpoint = name,
                    bytes = payload.len(),
                    error = %e,
                    "Dropped malformed message"
                );
                Err(e)
            }
        }
    }

    /// Waits for the next message on endpoint `name` without decoding it.
    ///
    /// # Errors
    ///
    /// As [`receive`](Self::receive), minus serialization.
    pub async fn receive_bytes(&mut self, name: &str) -> Result<(Envelope, Bytes), WireError> {
        let Self {
            name: manager,
            sockets,
            closing,
            ..
        } = self;
        let live = sockets.get_mut(name).ok_or_else(|| unknown(name))?;
        if !live.pattern.can_receive() {
            return Err(TransportError::unsupported(format!(
                "{} endpoint '{name}' cannot receive",
                live.pattern
            ))
            .into());
        }

        let frames = tokio::select! {
            biased;
            () = closing.cancelled() => {
                return Err(WireError::Closing { manager: manager.clone() });
            }
            frames = live.socket.recv() => frames?,
        };
        trace!(manager = %manager, endpoint = name, frames = frames.len(), "Received message");

        Envelope::open(frames).ok_or_else(|| {
            TransportError::new(TransportErrorKind::InvalidMessage, "received an empty message")
                .into()
        })
    }

    /// Adds a topic prefix to an open subscribe endpoint.
    ///
    /// Returns `false` (and changes nothing) if the topic was already subscribed.
    ///
    /// # Errors
    ///
    /// [`WireError::UnknownEndpoint`], or [`WireError::Transport`] for non-subscribe endpoints.
    pub async fn subscribe(&mut self, name: &str, topic: &str) -> Result<bool, WireError> {
        let manager = self.name.clone();
        let live = self.subscribe_socket(name)?;
        if live.subscriptions.iter().any(|t| t == topic) {
            debug!(manager = %manager, endpoint = name, topic, "Already subscribed");
            return Ok(false);
        }
        live.socket.subscribe(topic).await?;
        live.subscriptions.push(topic.to_string());
        debug!(manager = %manager, endpoint = name, topic, "Subscribed");
        Ok(true)
    }

    /// Removes a topic prefix from an open subscribe endpoint.
    ///
    /// Returns `false` if the topic was not subscribed.
    ///
    /// # Errors
    ///
    /// As [`subscribe`](Self::subscribe).
    pub async fn unsubscribe(&mut self, name: &str, topic: &str) -> Result<bool, WireError> {
        let manager = self.name.clone();
        let live = self.subscribe_socket(name)?;
        let Some(position) = live.subscriptions.iter().position(|t| t == topic) else {
            debug!(manager = %manager, endpoint = name, topic, "Not subscribed");
            return Ok(false);
        };
        live.socket.unsubscribe(topic).await?;
        live.subscriptions.remove(position);
        debug!(manager = %manager, endpoint = name, topic, "Unsubscribed");
        Ok(true)
    }

    /// Closes the socket of one live endpoint, unbinding or disconnecting it.
    ///
    /// The descriptor stays registered but the endpoint is not reopened; later calls naming it
    /// fail with [`WireError::UnknownEndpoint`]. The other sockets and the context are untouched.
    ///
    /// # Errors
    ///
    /// [`WireError::UnknownEndpoint`] if `name` is not live. [`WireError::Transport`] if the
    /// socket fails to close; the endpoint is removed either way.
    pub async fn detach(&mut self, name: &str) -> Result<(), WireError> {
        let mut live = self.sockets.remove(name).ok_or_else(|| unknown(name))?;
        self.open_order.retain(|opened| opened != name);
        let closed = live.socket.close().await;
        match &closed {
            Ok(()) => debug!(manager = %self.name, endpoint = name, "Detached endpoint"),
            Err(e) => {
                warn!(
                    manager = %self.name,
                    endpoint = name,
                    error = %e,
                    "Failed to detach endpoint"
                );
            }
        }
        closed.map_err(WireError::from)
    }

    /// Closes every live socket in reverse open order, then terminates the context.
    ///
    /// Wakes any suspended `send`/`receive` with [`WireError::Closing`]. Failures are logged and
    /// teardown continues. Calling it again is a no-op.
    #[instrument(skip(self), fields(manager = %self.name))]
    pub async fn close_all(&mut self) {
        if self.state == ManagerState::Closed {
            trace!("Already closed");
            return;
        }
        self.closing.cancel();
        self.release().await;
        self.state = ManagerState::Closed;
        debug!("Socket manager closed");
    }

    /// Manager name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ManagerState {
        self.state
    }

    /// Returns `true` while the sockets are open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ManagerState::Open
    }

    /// Codec used for payloads.
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Registered descriptors, in registration order.
    #[must_use]
    pub fn registered(&self) -> &[EndpointDescriptor] {
        &self.descriptors
    }

    /// Names of the endpoints with a live socket, in the order they were opened.
    #[must_use]
    pub fn live_endpoints(&self) -> Vec<&str> {
        self.open_order.iter().map(String::as_str).collect()
    }

    /// Address a bind endpoint actually bound to, with OS-assigned ports filled in.
    #[must_use]
    pub fn bound_address(&self, name: &str) -> Option<&str> {
        self.sockets.get(name)?.bound_address.as_deref()
    }

    /// Token cancelled when the manager starts closing.
    #[must_use]
    pub fn closing_token(&self) -> CancellationToken {
        self.closing.clone()
    }

    fn subject(&self) -> String {
        format!("socket manager '{}'", self.name)
    }

    fn ensure_live(&self, name: &str) -> Result<(), WireError> {
        if self.sockets.contains_key(name) {
            Ok(())
        } else {
            Err(unknown(name))
        }
    }

    fn subscribe_socket(&mut self, name: &str) -> Result<&mut LiveSocket, WireError> {
        let live = self.sockets.get_mut(name).ok_or_else(|| unknown(name))?;
        if live.pattern == Pattern::Subscribe {
            Ok(live)
        } else {
            Err(TransportError::unsupported(format!(
                "{} endpoint '{name}' has no subscriptions",
                live.pattern
            ))
            .into())
        }
    }

    async fn transmit(
        &mut self,
        name: &str,
        envelope: Envelope,
        payload: Bytes,
    ) -> Result<(), WireError> {
        let Self {
            name: manager,
            sockets,
            closing,
            ..
        } = self;
        let live = sockets.get_mut(name).ok_or_else(|| unknown(name))?;
        if !live.pattern.can_send() {
            return Err(TransportError::unsupported(format!(
                "{} endpoint '{name}' cannot send",
                live.pattern
            ))
            .into());
        }

        let envelope = if live.pattern.is_fan_out() && envelope.is_empty() {
            Envelope::topic(Bytes::new())
        } else {
            envelope
        };
        let frames = envelope.seal(payload);
        let count = frames.len();

        tokio::select! {
            biased;
            () = closing.cancelled() => Err(WireError::Closing { manager: manager.clone() }),
            sent = live.socket.send(frames) => {
                sent?;
                trace!(manager = %manager, endpoint = name, frames = count, "Sent message");
                Ok(())
            }
        }
    }

    async fn release(&mut self) {
        while let Some(name) = self.open_order.pop() {
            let Some(mut live) = self.sockets.remove(&name) else {
                continue;
            };
            match live.socket.close().await {
                Ok(()) => trace!(manager = %self.name, endpoint = %name, "Closed socket"),
                Err(e) => {
                    warn!(
                        manager = %self.name,
                        endpoint = %name,
                        error = %e,
                        "Failed to close socket"
                    );
                }
            }
        }
        if let Some(mut context) = self.context.take() {
            match context.terminate().await {
                Ok(()) => trace!(manager = %self.name, "Terminated context"),
                Err(e) => warn!(manager = %self.name, error = %e, "Failed to terminate context"),
            }
        }
    }
}

async fn open_endpoint(
    context: &mut dyn TransportContext,
    descriptor: &EndpointDescriptor,
    connect_timeout: Duration,
) -> Result<LiveSocket, TransportError> {
    let mut socket = context.create_socket(descriptor.pattern()).await?;
    match attach(socket.as_mut(), descriptor, connect_timeout).await {
        Ok(bound_address) => Ok(LiveSocket {
            pattern: descriptor.pattern(),
            socket,
            bound_address,
            subscriptions: descriptor.subscriptions().to_vec(),
        }),
        Err(e) => {
            if let Err(close_error) = socket.close().await {
                warn!(
                    endpoint = descriptor.name(),
                    error = %close_error,
                    "Failed to close socket after open failure"
                );
            }
            Err(e)
        }
    }
}

async fn attach(
    socket: &mut dyn TransportSocket,
    descriptor: &EndpointDescriptor,
    connect_timeout: Duration,
) -> Result<Option<String>, TransportError> {
    let bound_address = match descriptor.mode() {
        Mode::Bind => Some(socket.bind(descriptor.address()).await?),
        Mode::Connect => {
            tokio::time::timeout(connect_timeout, socket.connect(descriptor.address()))
                .await
                .map_err(|_| {
                    TransportError::new(
                        TransportErrorKind::ConnectTimeout,
                        format!(
                            "connecting to {} took longer than {:?}",
                            descriptor.address(),
                            connect_timeout
                        ),
                    )
                })??;
            None
        }
    };
    for topic in descriptor.subscriptions() {
        socket.subscribe(topic).await?;
    }
    Ok(bound_address)
}

fn unknown(name: &str) -> WireError {
    WireError::UnknownEndpoint {
        name: name.to_string(),
    }
}

impl fmt::Debug for SocketManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketManager")
            .field("name", &self.name)
            .field("transport", &self.transport.name())
            .field("codec", &self.codec)
            .field("state", &self.state)
            .field("registered", &self.descriptors.len())
            .field("live", &self.open_order)
            .finish_non_exhaustive()
    }
}

impl Drop for SocketManager {
    fn drop(&mut self) {
        if self.state == ManagerState::Open && !self.sockets.is_empty() {
            warn!(
                manager = %self.name,
                live = self.sockets.len(),
                "Socket manager dropped while open; call close_all first"
            );
        }
    }
}
