//! Runtime machinery of Acton Wire.
//!
//! *   [`SocketManager`]: owns the transport context and the sockets of one actor.
//! *   [`ActorRuntime`]: drives an [`Actor`](crate::traits::Actor) from socket setup to teardown
//!     on a single-threaded event loop.
//! *   [`config`]: XDG/TOML configuration.
//! *   [`logging`] and [`signals`]: process-level ambient services.

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

// --- Public Re-exports ---
pub use actor_runtime::{ActorRuntime, Exit, RunOutcome, RuntimeState};
pub use config::{EventLoopPreference, RuntimeConfig, SocketsConfig, TracingConfig, WireConfig};
pub use event_loop::EventLoop;
pub use logging::init_tracing;
pub use socket_manager::{ManagerState, SocketManager};

// --- Submodules ---

/// Defines the `ActorRuntime` and its outcome types.
mod actor_runtime;
/// Defines the configuration system for Acton Wire.
pub mod config;
/// Event loop selection and construction.
mod event_loop;
/// Tracing subscriber setup.
pub mod logging;
/// OS shutdown signals.
pub mod signals;
/// Defines the `SocketManager`.
mod socket_manager;
