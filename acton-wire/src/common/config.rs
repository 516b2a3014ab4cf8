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

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::message::Codec;

/// Name of the XDG prefix configuration is looked up under.
pub const CONFIG_PREFIX: &str = "acton-wire";

/// Configuration for Acton Wire.
///
/// Loaded from TOML in XDG-compliant directories. Every field has a default, so a partial file
/// only overrides what it names.
///
/// ```toml
/// [runtime]
/// grace_period_ms = 2000
/// event_loop = "standard"
///
/// [sockets]
/// codec = "message_pack"
///
/// [tracing]
/// level = "acton_wire=debug"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Actor runtime settings
    pub runtime: RuntimeConfig,
    /// Socket manager defaults
    pub sockets: SocketsConfig,
    /// Tracing and logging settings
    pub tracing: TracingConfig,
}

/// Event loop selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLoopPreference {
    /// Accelerated where available, standard otherwise.
    #[default]
    Auto,
    /// Ask for the accelerated loop; falls back to standard with a warning.
    Accelerated,
    /// Always the standard loop.
    Standard,
}

/// Actor runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How long a cancelled actor may keep running before it is abandoned, in milliseconds
    pub grace_period_ms: u64,
    /// Which event loop to build
    pub event_loop: EventLoopPreference,
    /// Treat SIGINT/SIGTERM/SIGQUIT and ctrl-c as shutdown requests
    pub handle_signals: bool,
    /// Upper bound for shutting the event loop down after teardown, in milliseconds
    pub loop_shutdown_timeout_ms: u64,
}

/// Socket manager defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketsConfig {
    /// Upper bound for a single connect, in milliseconds
    pub connect_timeout_ms: u64,
    /// Codec used to encode event payloads
    pub codec: Codec,
}

/// Tracing settings used by [`init_tracing`](crate::init_tracing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    /// Directory for a log file; stderr only when absent
    pub log_directory: Option<PathBuf>,
    /// Colored output on stderr
    pub ansi: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 5_000,
            event_loop: EventLoopPreference::Auto,
            handle_signals: true,
            loop_shutdown_timeout_ms: 1_000,
        }
    }
}

impl Default for SocketsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            codec: Codec::Json,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_directory: None,
            ansi: true,
        }
    }
}

impl RuntimeConfig {
    /// Grace period as a `Duration`
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Loop shutdown timeout as a `Duration`
    #[must_use]
    pub const fn loop_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.loop_shutdown_timeout_ms)
    }
}

impl SocketsConfig {
    /// Connect timeout as a `Duration`
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl WireConfig {
    /// Load configuration from XDG-compliant locations.
    ///
    /// Looks for `acton-wire/config.toml` under `$XDG_CONFIG_HOME` (falling back to
    /// `~/.config`) and then the XDG system config directories.
    ///
    /// If no configuration file is found, returns the default configuration.
    /// If a configuration file exists but is malformed, logs an error and uses defaults.
    #[must_use]
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix(CONFIG_PREFIX) {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit file, falling back to defaults on any error.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(path) {
            Ok(config_str) => match toml::from_str::<Self>(&config_str) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
