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

use std::fmt;

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use crate::common::config::EventLoopPreference;

/// Ticks between I/O driver polls on the accelerated loop. Tokio's default is 61.
const ACCELERATED_EVENT_INTERVAL: u32 = 7;

/// The single-threaded event loop an actor runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventLoop {
    /// Current-thread scheduler that polls for socket readiness more often.
    Accelerated,
    /// Tokio's current-thread scheduler with default tuning.
    Standard,
}

impl EventLoop {
    /// Returns `true` when the accelerated loop can be built on this platform.
    #[must_use]
    pub const fn accelerated_available() -> bool {
        cfg!(unix)
    }

    /// Picks the loop for `preference`, logging the choice.
    #[must_use]
    pub fn resolve(preference: EventLoopPreference) -> Self {
        let selected = match preference {
            EventLoopPreference::Standard => Self::Standard,
            EventLoopPreference::Auto | EventLoopPreference::Accelerated
                if Self::accelerated_available() =>
            {
                Self::Accelerated
            }
            EventLoopPreference::Accelerated => {
                warn!("Accelerated event loop is not available on this platform, using standard");
                Self::Standard
            }
            EventLoopPreference::Auto => {
                debug!("Accelerated event loop is not available on this platform");
                Self::Standard
            }
        };
        info!(event_loop = %selected, ?preference, "Selected event loop");
        selected
    }

    /// Builds the loop for `preference`, falling back to the standard loop if the accelerated
    /// one cannot be built.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if not even the standard loop can be built.
    pub fn build_for(preference: EventLoopPreference) -> std::io::Result<(Runtime, Self)> {
        let selected = Self::resolve(preference);
        match selected.build() {
            Ok(runtime) => Ok((runtime, selected)),
            Err(e) if selected == Self::Accelerated => {
                warn!(
                    error = %e,
                    "Failed to build accelerated event loop, falling back to standard"
                );
                Ok((Self::Standard.build()?, Self::Standard))
            }
            Err(e) => Err(e),
        }
    }

    fn build(self) -> std::io::Result<Runtime> {
        let mut builder = Builder::new_current_thread();
        builder.enable_all();
        if self == Self::Accelerated {
            builder.event_interval(ACCELERATED_EVENT_INTERVAL);
        }
        builder.build()
    }
}

impl fmt::Display for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accelerated => f.write_str("accelerated"),
            Self::Standard => f.write_str("standard"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_is_always_honoured() {
        assert_eq!(EventLoop::resolve(EventLoopPreference::Standard), EventLoop::Standard);
    }

    #[test]
    fn auto_follows_platform_support() {
        let expected = if EventLoop::accelerated_available() {
            EventLoop::Accelerated
        } else {
            EventLoop::Standard
        };
        assert_eq!(EventLoop::resolve(EventLoopPreference::Auto), expected);
        assert_eq!(EventLoop::resolve(EventLoopPreference::Accelerated), expected);
    }

    #[test]
    fn built_loop_runs_futures() {
        let (runtime, selected) = EventLoop::build_for(EventLoopPreference::Auto).unwrap();
        assert_eq!(selected, EventLoop::resolve(EventLoopPreference::Auto));
        assert_eq!(runtime.block_on(async { 1 + 1 }), 2);
    }
}
