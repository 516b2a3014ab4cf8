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

use crate::endpoint::address::{ParsedAddress, Scheme};
use crate::endpoint::{Mode, Pattern};
use crate::message::WireError;

/// Immutable description of one messaging endpoint.
///
/// A descriptor is validated when it is built, so a value of this type always names a
/// well-formed address whose mode fits its pattern. It performs no I/O; the
/// [`SocketManager`](crate::SocketManager) turns it into a live socket.
///
/// # Example
///
/// ```rust
/// use acton_wire::prelude::*;
///
/// let publisher =
///     EndpointDescriptor::bind("pub", Pattern::Publish, address::tcp("127.0.0.1", 5555))?;
/// let subscriber = EndpointDescriptor::connect("sub", Pattern::Subscribe, "tcp://127.0.0.1:5555")?
///     .with_subscription("prices")?;
/// assert_eq!(subscriber.subscriptions(), ["prices"]);
/// # Ok::<(), WireError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    name: String,
    pattern: Pattern,
    address: String,
    mode: Mode,
    scheme: Scheme,
    subscriptions: Vec<String>,
}

impl EndpointDescriptor {
    /// Builds and validates a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Configuration`] when the name or address is empty or malformed,
    /// the scheme is not supported, a multicast address is used with a pattern other than
    /// publish/subscribe, or a connecting endpoint targets a wildcard address.
    pub fn new(
        name: impl Into<String>,
        pattern: Pattern,
        address: impl Into<String>,
        mode: Mode,
    ) -> Result<Self, WireError> {
        let name = name.into();
        let address = address.into().trim().to_string();

        if name.trim().is_empty() {
            return Err(WireError::configuration("endpoint name is empty"));
        }

        let parsed = ParsedAddress::parse(&address)?;
        if parsed.scheme.is_multicast() && !pattern.supports_multicast() {
            return Err(WireError::configuration(format!(
                "{pattern} endpoint '{name}' cannot use multicast address '{address}'"
            )));
        }
        if mode == Mode::Connect && parsed.is_wildcard() {
            return Err(WireError::configuration(format!(
                "endpoint '{name}' cannot connect to wildcard address '{address}'"
            )));
        }
        let scheme = parsed.scheme;

        let subscriptions = if pattern == Pattern::Subscribe {
            vec![String::new()]
        } else {
            Vec::new()
        };

        Ok(Self {
            name,
            pattern,
            address,
            mode,
            scheme,
            subscriptions,
        })
    }

    /// Builds a descriptor that binds to `address`.
    ///
    /// # Errors
    ///
    /// See [`EndpointDescriptor::new`].
    pub fn bind(
        name: impl Into<String>,
        pattern: Pattern,
        address: impl Into<String>,
    ) -> Result<Self, WireError> {
        Self::new(name, pattern, address, Mode::Bind)
    }

    /// Builds a descriptor that connects to `address`.
    ///
    /// # Errors
    ///
    /// See [`EndpointDescriptor::new`].
    pub fn connect(
        name: impl Into<String>,
        pattern: Pattern,
        address: impl Into<String>,
    ) -> Result<Self, WireError> {
        Self::new(name, pattern, address, Mode::Connect)
    }

    /// Restricts a subscribe endpoint to `topic` prefixes.
    ///
    /// The first call replaces the default catch-all subscription; later calls add topics.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Configuration`] if the pattern is not [`Pattern::Subscribe`].
    pub fn with_subscription(mut self, topic: impl Into<String>) -> Result<Self, WireError> {
        if self.pattern != Pattern::Subscribe {
            return Err(WireError::configuration(format!(
                "{} endpoint '{}' cannot subscribe to topics",
                self.pattern, self.name
            )));
        }
        if self.subscriptions == [String::new()] {
            self.subscriptions.clear();
        }
        let topic = topic.into();
        if !self.subscriptions.contains(&topic) {
            self.subscriptions.push(topic);
        }
        Ok(self)
    }

    /// Name of the endpoint, unique within its manager.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Messaging pattern.
    #[must_use]
    pub const fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Address as given.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Bind or connect.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Transport scheme of the address.
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Topic prefixes a subscribe endpoint applies once open; empty for other patterns.
    #[must_use]
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({} {} {})",
            self.name, self.pattern, self.mode, self.address
        )
    }
}

/// Reference to an endpoint registered on a manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointHandle {
    manager: String,
    name: String,
    index: usize,
}

impl EndpointHandle {
    pub(crate) fn new(manager: &str, name: &str, index: usize) -> Self {
        Self {
            manager: manager.to_string(),
            name: name.to_string(),
            index,
        }
    }

    /// Name of the owning manager.
    #[must_use]
    pub fn manager(&self) -> &str {
        &self.manager
    }

    /// Endpoint name, as used with `send`/`receive`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registration position; sockets open in this order.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

impl AsRef<str> for EndpointHandle {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
