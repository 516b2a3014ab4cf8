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

//! Tracing subscriber setup for services built on Acton Wire.

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::common::config::TracingConfig;

/// File name used inside [`TracingConfig::log_directory`].
pub const LOG_FILE_NAME: &str = "acton-wire.log";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over [`TracingConfig::level`]. Output always goes to stderr; when a log
/// directory is configured it is also written, without colors, to [`LOG_FILE_NAME`] there
/// through a non-blocking writer. Keep the returned guard alive for as long as the process logs.
///
/// Returns `None` if a global subscriber is already installed, or no file writer was set up.
#[must_use = "dropping the guard stops the file writer"]
pub fn init_tracing(config: &TracingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(true);

    let mut unusable_directory = None;
    let (file_layer, guard) = match config.log_directory.as_deref() {
        Some(directory) => match std::fs::create_dir_all(directory) {
            Ok(()) => {
                let appender = RollingFileAppender::new(Rotation::NEVER, directory, LOG_FILE_NAME);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_line_number(true);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                unusable_directory = Some((directory.display().to_string(), e));
                (None, None)
            }
        },
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    if installed.is_err() {
        return None;
    }

    if let Some((directory, e)) = unusable_directory {
        warn!("Could not create log directory {}: {}; logging to stderr only", directory, e);
    }
    guard
}
