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

//! Test utilities for Acton Wire.
//!
//! The [`wire_test`](prelude::wire_test) attribute turns an `async fn` into a
//! regular `#[test]` that runs on a single-threaded Tokio runtime, the same
//! scheduler flavour an actor process uses. Panics raised on the test thread,
//! including inside spawned tasks, are recorded by a single process-wide hook
//! and re-raised with their location once the runtime has finished. The body
//! runs inside a `wire_test` tracing span.
//!
//! ```rust,ignore
//! use acton_wire_test::prelude::*;
//!
//! #[wire_test]
//! async fn opens_and_closes() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

/// Commonly used test items.
pub mod prelude {
    pub use acton_wire_test_macro::wire_test;
}

mod panics;

/// Items referenced by code that `#[wire_test]` expands to, so test crates do
/// not need to depend on them directly.
#[doc(hidden)]
pub mod __private {
    pub use crate::panics::{install_panic_hook, take_panic, RecordedPanic};
    pub use tokio;
    pub use tracing;
}
