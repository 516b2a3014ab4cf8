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

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Cancellation context handed to [`Actor::start`](crate::traits::Actor::start).
///
/// The runtime cancels the context when an external shutdown is requested. Actors are expected
/// to observe it and return; the runtime waits at most [`grace_period`](Self::grace_period)
/// before abandoning `start` and tearing down anyway.
///
/// Socket managers are not closed while the actor winds down. To stop waiting on a socket when
/// shutdown is requested, wrap the call in [`until_cancelled`](Self::until_cancelled).
#[derive(Debug, Clone)]
pub struct ActorContext {
    identity: Arc<str>,
    token: CancellationToken,
    grace_period: Duration,
}

impl ActorContext {
    pub(crate) fn new(identity: &str, token: CancellationToken, grace_period: Duration) -> Self {
        Self {
            identity: Arc::from(identity),
            token,
            grace_period,
        }
    }

    /// Identity of the actor being run.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when shutdown is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// A child token, cancelled together with this context.
    ///
    /// Useful for tasks the actor spawns on the same loop.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// How long the runtime waits for `start` to return after cancellation.
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Awaits `future`, or returns `None` as soon as shutdown is requested.
    pub async fn until_cancelled<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            output = future => Some(output),
        }
    }
}
