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

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, trace, warn, Instrument};

use crate::actor::ActorContext;
use crate::common::config::WireConfig;
use crate::common::event_loop::EventLoop;
use crate::common::signals;
use crate::message::WireError;
use crate::traits::Actor;

/// Lifecycle of an [`ActorRuntime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeState {
    /// Created, nothing started.
    Idle,
    /// `start` is executing.
    Running,
    /// `start` returned `Ok` on its own.
    Completed,
    /// An external shutdown request ended the run.
    Cancelled,
    /// `start` returned an error or panicked, or the sockets could not be opened.
    Failed,
    /// Every socket manager has been closed. Terminal.
    TornDown,
}

/// How a run ended, for runs that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exit {
    /// `start` returned on its own.
    Completed,
    /// Shutdown was requested.
    Cancelled {
        /// `false` if `start` was still running when the grace period ran out and was abandoned.
        acknowledged: bool,
    },
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Identity of the actor.
    pub identity: String,
    /// How the run ended.
    pub exit: Exit,
    /// The loop the actor ran on.
    pub event_loop: EventLoop,
}

impl RunOutcome {
    /// Process exit status for this outcome: `0`, or `1` for an abandoned actor.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.exit {
            Exit::Completed | Exit::Cancelled { acknowledged: true } => 0,
            Exit::Cancelled { acknowledged: false } => 1,
        }
    }
}

/// Runs one actor from socket setup to teardown.
///
/// The runtime opens the actor's socket managers, runs [`Actor::start`], and closes every
/// manager exactly once afterwards, whether `start` returned, failed, panicked or was cancelled.
/// Cancellation comes from [`shutdown_token`](Self::shutdown_token) and, unless disabled in
/// [`RuntimeConfig`](crate::config::RuntimeConfig), from OS termination signals.
///
/// Cancelling only cancels the [`ActorContext`]. The sockets stay open during the grace period,
/// so an actor can still send a final message; they are closed once `start` returns or is
/// abandoned.
///
/// # Example
///
/// ```rust,ignore
/// fn main() -> anyhow::Result<()> {
///     let config = WireConfig::load();
///     let _guard = init_tracing(&config.tracing);
///     let outcome = ActorRuntime::with_config(config).run(MyActor::new()?)?;
///     std::process::exit(outcome.exit_code());
/// }
/// ```
#[derive(Debug)]
pub struct ActorRuntime {
    config: WireConfig,
    state: RuntimeState,
    shutdown: CancellationToken,
    event_loop: Option<EventLoop>,
}

impl Default for ActorRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorRuntime {
    /// Creates a runtime configured from the XDG configuration file.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WireConfig::load())
    }

    /// Creates a runtime with an explicit configuration.
    #[must_use]
    pub fn with_config(config: WireConfig) -> Self {
        Self {
            config,
            state: RuntimeState::Idle,
            shutdown: CancellationToken::new(),
            event_loop: None,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &WireConfig {
        &self.config
    }

    /// Cancelling this token requests shutdown, exactly like an OS signal.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RuntimeState {
        self.state
    }

    /// The loop selected by [`run`](Self::run); `None` before it starts or when driven on a
    /// caller-owned loop.
    #[must_use]
    pub const fn event_loop(&self) -> Option<EventLoop> {
        self.event_loop
    }

    /// Builds the configured event loop on the current thread and drives `actor` to the end.
    ///
    /// Must not be called from inside another tokio runtime; use [`drive`](Self::drive) there.
    ///
    /// # Errors
    ///
    /// Fails if no event loop can be built, if the sockets cannot be opened, or if `start`
    /// fails or panics. The error carries the actor identity and is returned after teardown.
    pub fn run<A: Actor>(mut self, mut actor: A) -> anyhow::Result<RunOutcome> {
        let (runtime, event_loop) = EventLoop::build_for(self.config.runtime.event_loop)?;
        self.event_loop = Some(event_loop);
        let result = runtime.block_on(self.drive(&mut actor));
        runtime.shutdown_timeout(self.config.runtime.loop_shutdown_timeout());
        trace!(state = ?self.state, "Event loop shut down");
        result
    }

    /// Drives `actor` on the caller's event loop.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run). Driving a second time fails with [`WireError::Lifecycle`].
    pub async fn drive<A: Actor>(&mut self, actor: &mut A) -> anyhow::Result<RunOutcome> {
        let identity = actor.identity().to_string();
        if self.state != RuntimeState::Idle {
            return Err(WireError::lifecycle(
                format!("actor runtime for '{identity}'"),
                "a runtime drives exactly one actor",
            )
            .into());
        }
        let event_loop = self.event_loop.unwrap_or(EventLoop::Standard);
        let span = info_span!("actor", identity = %identity, event_loop = %event_loop);
        self.lifecycle(actor, identity, event_loop).instrument(span).await
    }

    async fn lifecycle<A: Actor>(
        &mut self,
        actor: &mut A,
        identity: String,
        event_loop: EventLoop,
    ) -> anyhow::Result<RunOutcome> {
        if let Err(e) = open_managers(actor).await {
            error!(error = %e, "Failed to open sockets");
            self.transition(RuntimeState::Failed);
            close_managers(actor).await;
            self.transition(RuntimeState::TornDown);
            return Err(anyhow::Error::new(e)
                .context(format!("actor '{identity}' could not open its sockets")));
        }

        let grace_period = self.config.runtime.grace_period();
        let cancel = CancellationToken::new();
        let ctx = ActorContext::new(&identity, cancel.clone(), grace_period);

        self.transition(RuntimeState::Running);
        info!("Actor started");
        let ending = {
            let start = AssertUnwindSafe(actor.start(&ctx)).catch_unwind();
            tokio::pin!(start);

            let handle_signals = self.config.runtime.handle_signals;
            let finished = tokio::select! {
                biased;
                result = &mut start => Some(result),
                () = shutdown_requested(self.shutdown.clone(), handle_signals) => None,
            };

            match finished {
                Some(Ok(Ok(()))) => Ending::Completed,
                Some(Ok(Err(e))) => Ending::Failed(e),
                Some(Err(panic)) => Ending::Failed(panic_error(&*panic)),
                None => {
                    info!(?grace_period, "Shutdown requested, cancelling actor");
                    cancel.cancel();
                    match tokio::time::timeout(grace_period, &mut start).await {
                        Ok(Ok(Ok(()))) => Ending::Cancelled { acknowledged: true },
                        Ok(Ok(Err(e))) if is_closing(&e) => {
                            Ending::Cancelled { acknowledged: true }
                        }
                        Ok(Ok(Err(e))) => Ending::Failed(e),
                        Ok(Err(panic)) => Ending::Failed(panic_error(&*panic)),
                        Err(_) => {
                            warn!(?grace_period, "Actor ignored cancellation, abandoning it");
                            Ending::Cancelled { acknowledged: false }
                        }
                    }
                }
            }
        };

        let exit = match ending {
            Ending::Completed => {
                self.transition(RuntimeState::Completed);
                Ok(Exit::Completed)
            }
            Ending::Cancelled { acknowledged } => {
                self.transition(RuntimeState::Cancelled);
                Ok(Exit::Cancelled { acknowledged })
            }
            Ending::Failed(e) => {
                error!(error = %e, "Actor failed");
                self.transition(RuntimeState::Failed);
                Err(e)
            }
        };

        close_managers(actor).await;
        self.transition(RuntimeState::TornDown);

        match exit {
            Ok(exit) => {
                info!(?exit, "Actor finished");
                Ok(RunOutcome {
                    identity,
                    exit,
                    event_loop,
                })
            }
            Err(e) => Err(e.context(format!("actor '{identity}' failed"))),
        }
    }

    fn transition(&mut self, next: RuntimeState) {
        trace!(from = ?self.state, to = ?next, "Runtime state change");
        self.state = next;
    }
}

enum Ending {
    Completed,
    Cancelled { acknowledged: bool },
    Failed(anyhow::Error),
}

async fn open_managers<A: Actor>(actor: &mut A) -> Result<(), WireError> {
    for manager in actor.socket_managers() {
        if manager.state() == crate::common::ManagerState::Registered {
            manager.open_all().await?;
        }
    }
    Ok(())
}

async fn close_managers<A: Actor>(actor: &mut A) {
    for manager in actor.socket_managers() {
        manager.close_all().await;
    }
}

/// Completes when the shutdown token is cancelled or, with `handle_signals`, a signal arrives.
async fn shutdown_requested(shutdown: CancellationToken, handle_signals: bool) {
    if !handle_signals {
        shutdown.cancelled().await;
        return;
    }
    tokio::select! {
        () = shutdown.cancelled() => {}
        installed = signals::wait_for_shutdown_signal() => {
            if let Err(e) = installed {
                warn!(
                    error = %e,
                    "Could not install signal handlers, waiting for the shutdown token only"
                );
                shutdown.cancelled().await;
            }
        }
    }
}

fn is_closing(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<WireError>(), Some(WireError::Closing { .. })))
}

fn panic_error(payload: &(dyn Any + Send)) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::anyhow!("actor panicked: {message}")
}
