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

use async_trait::async_trait;

use crate::actor::ActorContext;
use crate::common::SocketManager;

/// A single long-running, message-driven service.
///
/// An actor owns its socket managers and exposes one entry point, [`start`](Actor::start).
/// The [`ActorRuntime`](crate::ActorRuntime) opens the managers before calling it and
/// closes them after it returns, whatever the outcome. Returning from `start` means the actor
/// is done.
///
/// # Example
///
/// ```rust,no_run
/// use acton_wire::prelude::*;
///
/// struct Echo {
///     sockets: SocketManager,
/// }
///
/// #[async_trait]
/// impl Actor for Echo {
///     fn identity(&self) -> &str {
///         "echo"
///     }
///
///     fn socket_managers(&mut self) -> Vec<&mut SocketManager> {
///         vec![&mut self.sockets]
///     }
///
///     async fn start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
///         while let Some(request) =
///             ctx.until_cancelled(self.sockets.receive::<String>("rep")).await
///         {
///             let request = request?;
///             self.sockets.send("rep", &request).await?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Actor: Send {
    /// Stable identifier used in logs and outcomes.
    fn identity(&self) -> &str;

    /// The managers the runtime opens before `start` and closes afterwards.
    fn socket_managers(&mut self) -> Vec<&mut SocketManager>;

    /// Runs the actor's behaviour until it finishes or observes cancellation on `ctx`.
    ///
    /// # Errors
    ///
    /// Any error ends the run as failed; the runtime still tears down every manager.
    async fn start(&mut self, ctx: &ActorContext) -> anyhow::Result<()>;
}
