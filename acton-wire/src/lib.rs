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

#![forbid(unsafe_code)]
#![forbid(missing_docs)] // Keep this to enforce coverage

//! # Acton Wire
//!
//! Building blocks for independent, message-exchanging actors that each live in their own OS
//! process and talk over asynchronous sockets, without a broker in between.
//!
//! ## Key Concepts
//!
//! - **Endpoints (`EndpointDescriptor`)**: validated, immutable descriptions of one socket:
//!   messaging [`Pattern`](endpoint::Pattern), address and bind/connect [`Mode`](endpoint::Mode).
//! - **Socket managers (`SocketManager`)**: own one transport context and the sockets of one
//!   actor. Opening is all-or-nothing, closing is idempotent.
//! - **Actors (`Actor`)**: a service with a single `start` entry point that owns its managers.
//! - **Runtime (`ActorRuntime`)**: runs one actor per process on a single-threaded event loop,
//!   handles shutdown signals with a bounded grace period, and always tears the sockets down.
//! - **Codecs (`Codec`)**: JSON, MessagePack or Bincode payloads via serde.
//! - **Transports**: the [`Transport`](traits::Transport) traits isolate the socket library; the
//!   default backend is ZeroMQ ([`ZmqTransport`](transport::ZmqTransport)).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use acton_wire::prelude::*;
//!
//! #[acton_event]
//! struct Tick {
//!     n: u32,
//! }
//!
//! struct Clock {
//!     sockets: SocketManager,
//! }
//!
//! #[async_trait]
//! impl Actor for Clock {
//!     fn identity(&self) -> &str {
//!         "clock"
//!     }
//!
//!     fn socket_managers(&mut self) -> Vec<&mut SocketManager> {
//!         vec![&mut self.sockets]
//!     }
//!
//!     async fn start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
//!         for n in 0.. {
//!             if ctx.is_cancelled() {
//!                 break;
//!             }
//!             self.sockets.send("ticks", &Tick { n }).await?;
//!             tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut sockets = SocketManager::new("clock", ZmqTransport::new());
//!     sockets.register(EndpointDescriptor::bind("ticks", Pattern::Publish, "tcp://*:5555")?)?;
//!     let outcome = ActorRuntime::new().run(Clock { sockets })?;
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

/// Internal utilities and structures used throughout Acton Wire.
pub(crate) mod common;

/// Defines the actor context.
pub(crate) mod actor;

/// Defines codecs, events and error types.
pub(crate) mod message;

/// Endpoint descriptors and address helpers.
pub mod endpoint;

/// Core traits: the actor contract and the transport boundary.
pub mod traits;

/// Transport backends.
pub mod transport;

pub use crate::actor::ActorContext;
pub use crate::common::{
    config, init_tracing, logging, signals, ActorRuntime, EventLoop, Exit, ManagerState,
    RunOutcome, RuntimeState, SocketManager,
};
pub use crate::message::{Codec, Envelope, Event, TransportError, TransportErrorKind, WireError};

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `acton-wire-macro`)
/// *   [`acton_wire_macro::acton_event`]: Attribute macro for event payload types.
///
/// ## External Crates
/// *   [`async_trait::async_trait`](https://docs.rs/async-trait/latest/async_trait/attr.async_trait.html): The macro for defining async functions in traits.
///
/// ## Core Types
/// *   [`crate::traits::Actor`]: The contract a service implements.
/// *   [`crate::ActorContext`]: Cancellation context passed to `start`.
/// *   [`crate::ActorRuntime`]: Runs an actor from setup to teardown.
/// *   [`crate::SocketManager`]: Owns the sockets of one actor.
/// *   [`crate::endpoint::EndpointDescriptor`]: Validated endpoint description.
/// *   [`crate::Codec`], [`crate::Event`], [`crate::Envelope`]: Payload encoding and framing.
/// *   [`crate::WireError`]: The error type of every fallible operation.
/// *   [`crate::config::WireConfig`]: XDG/TOML configuration.
pub mod prelude {
    // Macros from acton-wire-macro
    pub use acton_wire_macro::acton_event;

    // External crate re-exports
    pub use async_trait::async_trait;

    // Core types
    pub use crate::actor::ActorContext;
    pub use crate::common::config::{
        EventLoopPreference, RuntimeConfig, SocketsConfig, TracingConfig, WireConfig,
    };
    pub use crate::common::{
        init_tracing, ActorRuntime, EventLoop, Exit, ManagerState, RunOutcome, RuntimeState,
        SocketManager,
    };
    pub use crate::endpoint::{address, EndpointDescriptor, EndpointHandle, Mode, Pattern};
    pub use crate::message::{Codec, Envelope, Event, TransportError, TransportErrorKind, WireError};
    pub use crate::traits::{Actor, Transport, TransportContext, TransportSocket};

    #[cfg(feature = "zmq")]
    pub use crate::transport::ZmqTransport;
}
