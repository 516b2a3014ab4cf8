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

//! An in-memory transport that records every call and can be scripted to fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use acton_wire::endpoint::Pattern;
use async_trait::async_trait;
use acton_wire::traits::{Transport, TransportContext, TransportSocket};
use acton_wire::{TransportError, TransportErrorKind};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateContext,
    Bind(String),
    Connect(String),
    Subscribe(String, String),
    Close(String),
    Terminate,
}

type Inbox = (usize, Pattern, mpsc::UnboundedSender<Vec<Bytes>>);

#[derive(Debug, Default)]
struct Shared {
    calls: Mutex<Vec<Call>>,
    binds: AtomicUsize,
    fail_bind_at: Mutex<Option<usize>>,
    stall_connects: Mutex<bool>,
    next_socket: AtomicUsize,
    bus: Mutex<HashMap<String, Vec<Inbox>>>,
}

/// Transport whose sockets exchange messages through an in-process bus keyed by address.
///
/// Every socket attached to an address receives what any other socket on that address sends,
/// provided its pattern can receive.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    shared: Arc<Shared>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `nth` bind (1-based, counted across all contexts) fail with "address in use".
    pub fn fail_bind_at(self, nth: usize) -> Self {
        *self.shared.fail_bind_at.lock() = Some(nth);
        self
    }

    /// Makes every connect wait forever.
    pub fn stall_connects(self) -> Self {
        *self.shared.stall_connects.lock() = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().clone()
    }

    pub fn count(&self, wanted: impl Fn(&Call) -> bool) -> usize {
        self.shared.calls.lock().iter().filter(|call| wanted(call)).count()
    }

    /// Number of sockets currently attached to the bus.
    pub fn attached(&self) -> usize {
        self.shared.bus.lock().values().map(Vec::len).sum()
    }

    /// Delivers `frames` to every receiving socket on `address`, as if a peer had sent them.
    pub fn inject(&self, address: &str, frames: Vec<Bytes>) {
        if let Some(inboxes) = self.shared.bus.lock().get(address) {
            for (_, pattern, inbox) in inboxes {
                if pattern.can_receive() {
                    let _ = inbox.send(frames.clone());
                }
            }
        }
    }

    fn record(&self, call: Call) {
        self.shared.calls.lock().push(call);
    }
}

impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn create_context(&self) -> Result<Box<dyn TransportContext>, TransportError> {
        self.record(Call::CreateContext);
        Ok(Box::new(ScriptedContext {
            transport: self.clone(),
        }))
    }
}

struct ScriptedContext {
    transport: ScriptedTransport,
}

#[async_trait]
impl TransportContext for ScriptedContext {
    async fn create_socket(
        &mut self,
        pattern: Pattern,
    ) -> Result<Box<dyn TransportSocket>, TransportError> {
        if pattern == Pattern::Pair {
            return Err(TransportError::unsupported("no PAIR sockets here"));
        }
        let (sender, inbox) = mpsc::unbounded_channel();
        Ok(Box::new(ScriptedSocket {
            id: self.transport.shared.next_socket.fetch_add(1, Ordering::SeqCst),
            pattern,
            transport: self.transport.clone(),
            address: None,
            sender: Some(sender),
            inbox,
        }))
    }

    async fn terminate(&mut self) -> Result<(), TransportError> {
        self.transport.record(Call::Terminate);
        Ok(())
    }
}

struct ScriptedSocket {
    id: usize,
    pattern: Pattern,
    transport: ScriptedTransport,
    address: Option<String>,
    sender: Option<mpsc::UnboundedSender<Vec<Bytes>>>,
    inbox: mpsc::UnboundedReceiver<Vec<Bytes>>,
}

impl ScriptedSocket {
    fn attach(&mut self, address: &str) -> Result<(), TransportError> {
        let sender = self
            .sender
            .take()
            .ok_or_else(|| TransportError::closed("socket already attached or closed"))?;
        self.transport
            .shared
            .bus
            .lock()
            .entry(address.to_string())
            .or_default()
            .push((self.id, self.pattern, sender));
        self.address = Some(address.to_string());
        Ok(())
    }
}

#[async_trait]
impl TransportSocket for ScriptedSocket {
    async fn bind(&mut self, address: &str) -> Result<String, TransportError> {
        let nth = self.transport.shared.binds.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.transport.shared.fail_bind_at.lock() == Some(nth) {
            return Err(TransportError::new(TransportErrorKind::AddressInUse, address));
        }
        self.attach(address)?;
        self.transport.record(Call::Bind(address.to_string()));
        Ok(address.to_string())
    }

    async fn connect(&mut self, address: &str) -> Result<(), TransportError> {
        let stall = *self.transport.shared.stall_connects.lock();
        if stall {
            std::future::pending::<()>().await;
        }
        self.attach(address)?;
        self.transport.record(Call::Connect(address.to_string()));
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let address = self.address.clone().unwrap_or_default();
        self.transport.record(Call::Subscribe(address, topic.to_string()));
        Ok(())
    }

    async fn unsubscribe(&mut self, _topic: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&mut self, frames: Vec<Bytes>) -> Result<(), TransportError> {
        let address = self
            .address
            .as_deref()
            .ok_or_else(|| TransportError::closed("socket is not attached"))?;
        if let Some(inboxes) = self.transport.shared.bus.lock().get(address) {
            for (id, pattern, inbox) in inboxes {
                if *id != self.id && pattern.can_receive() {
                    let _ = inbox.send(frames.clone());
                }
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<Bytes>, TransportError> {
        self.inbox
            .recv()
            .await
            .ok_or_else(|| TransportError::closed("socket closed"))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(address) = self.address.take() else {
            return Ok(());
        };
        if let Some(inboxes) = self.transport.shared.bus.lock().get_mut(&address) {
            inboxes.retain(|(id, _, _)| *id != self.id);
        }
        self.transport.record(Call::Close(address));
        Ok(())
    }
}
