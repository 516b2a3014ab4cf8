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

//! Process-wide panic hook shared by every `#[wire_test]` in a test binary.
//!
//! Panics are recorded per thread, so a test only sees the panics raised on its own thread.
//! Each test drives a current-thread runtime, which polls all of its tasks on that thread.

use std::panic;
use std::sync::Once;
use std::thread::{self, ThreadId};

use parking_lot::{const_mutex, Mutex};

/// A panic observed on a test thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPanic {
    /// The panic message, or a placeholder for non-string payloads.
    pub message: String,
    /// `file:line:column` of the panic, if known.
    pub location: String,
}

static INSTALL: Once = Once::new();
static RECORDED: Mutex<Vec<(ThreadId, RecordedPanic)>> = const_mutex(Vec::new());

/// Installs the recording hook once per process; later calls do nothing.
///
/// The hook chains to whatever hook was installed before it.
pub fn install_panic_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let message = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "No error message".to_string());
            let location = info.location().map_or_else(
                || "unknown location".to_string(),
                |l| format!("{}:{}:{}", l.file(), l.line(), l.column()),
            );
            tracing::error!(%location, "Panic: {message}");
            RECORDED
                .lock()
                .push((thread::current().id(), RecordedPanic { message, location }));
            previous(info);
        }));
    });
}

/// Removes the panics recorded on the calling thread and returns the first of them.
pub fn take_panic() -> Option<RecordedPanic> {
    let current = thread::current().id();
    let mut first = None;
    RECORDED.lock().retain(|(thread, recorded)| {
        if *thread != current {
            return true;
        }
        if first.is_none() {
            first = Some(recorded.clone());
        }
        false
    });
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_are_kept_per_thread() {
        install_panic_hook();
        install_panic_hook();

        let other = thread::spawn(|| {
            let _ = panic::catch_unwind(|| panic!("elsewhere"));
            take_panic()
        })
        .join()
        .unwrap();
        assert_eq!(other.map(|p| p.message), Some("elsewhere".to_string()));

        assert_eq!(take_panic(), None);
        let _ = panic::catch_unwind(|| panic!("here"));
        let recorded = take_panic().unwrap();
        assert_eq!(recorded.message, "here");
        assert!(recorded.location.contains("panics.rs"), "{}", recorded.location);
        assert_eq!(take_panic(), None);
    }
}
