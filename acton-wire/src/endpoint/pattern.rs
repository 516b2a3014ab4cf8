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

use serde::{Deserialize, Serialize};

/// Messaging topology of an endpoint.
///
/// Delivery semantics (fan-out, round-robin, request/reply pairing) are provided by the
/// transport; Acton Wire only picks the pattern and enforces which directions it allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Fan-out sender of a publish/subscribe pair.
    Publish,
    /// Topic-filtered receiver of a publish/subscribe pair.
    Subscribe,
    /// Load-balancing sender of a pipeline.
    Push,
    /// Fair-queued receiver of a pipeline.
    Pull,
    /// Client side of a strict request/reply exchange.
    Request,
    /// Server side of a strict request/reply exchange.
    Reply,
    /// Identity-routing server socket.
    Router,
    /// Asynchronous client of a router.
    Dealer,
    /// Exclusive one-to-one connection.
    Pair,
}

impl Pattern {
    /// Every pattern, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Publish,
        Self::Subscribe,
        Self::Push,
        Self::Pull,
        Self::Request,
        Self::Reply,
        Self::Router,
        Self::Dealer,
        Self::Pair,
    ];

    /// Whether events can be sent on an endpoint of this pattern.
    #[must_use]
    pub const fn can_send(self) -> bool {
        !matches!(self, Self::Subscribe | Self::Pull)
    }

    /// Whether events can be received on an endpoint of this pattern.
    #[must_use]
    pub const fn can_receive(self) -> bool {
        !matches!(self, Self::Publish | Self::Push)
    }

    /// Whether the transport copies each event to every connected peer.
    #[must_use]
    pub const fn is_fan_out(self) -> bool {
        matches!(self, Self::Publish)
    }

    /// Whether the pattern can run over multicast (`pgm`/`epgm`) addresses.
    #[must_use]
    pub const fn supports_multicast(self) -> bool {
        matches!(self, Self::Publish | Self::Subscribe)
    }

    /// Upper-case transport name (`PUB`, `SUB`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "PUB",
            Self::Subscribe => "SUB",
            Self::Push => "PUSH",
            Self::Pull => "PULL",
            Self::Request => "REQ",
            Self::Reply => "REP",
            Self::Router => "ROUTER",
            Self::Dealer => "DEALER",
            Self::Pair => "PAIR",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an endpoint owns its address or attaches to a peer that does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Listen on the address.
    Bind,
    /// Attach to a peer listening on the address.
    Connect,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind => f.write_str("bind"),
            Self::Connect => f.write_str("connect"),
        }
    }
}
