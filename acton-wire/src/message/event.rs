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

use bytes::Bytes;

/// Routing frames that travel in front of an event's payload.
///
/// What the frames mean depends on the endpoint pattern: a publish/subscribe envelope
/// carries the topic, a router envelope carries the peer identity (followed by an empty
/// delimiter when the peer is a request socket). Patterns without routing use an empty
/// envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope(Vec<Bytes>);

impl Envelope {
    /// An envelope without routing frames.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// An envelope carrying a publish/subscribe topic.
    #[must_use]
    pub fn topic(topic: impl Into<Bytes>) -> Self {
        Self(vec![topic.into()])
    }

    /// An envelope that routes a reply back to `identity` through a router endpoint.
    ///
    /// Includes the empty delimiter frame request peers expect.
    #[must_use]
    pub fn routed(identity: impl Into<Bytes>) -> Self {
        Self(vec![identity.into(), Bytes::new()])
    }

    /// The first frame, read as a topic.
    #[must_use]
    pub fn topic_frame(&self) -> Option<&Bytes> {
        self.0.first()
    }

    /// The first frame, read as a peer identity.
    #[must_use]
    pub fn identity(&self) -> Option<&Bytes> {
        self.0.first()
    }

    /// All routing frames.
    #[must_use]
    pub fn frames(&self) -> &[Bytes] {
        &self.0
    }

    /// Whether the envelope has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends `payload` and returns the complete frame sequence for the wire.
    pub(crate) fn seal(self, payload: Bytes) -> Vec<Bytes> {
        let mut frames = self.0;
        frames.push(payload);
        frames
    }

    /// Splits a received frame sequence into envelope and payload.
    ///
    /// The payload is always the last frame. Returns `None` for an empty sequence.
    pub(crate) fn open(mut frames: Vec<Bytes>) -> Option<(Self, Bytes)> {
        let payload = frames.pop()?;
        Some((Self(frames), payload))
    }
}

/// A typed event together with its routing envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    /// Routing frames (topic, identity) as seen on the wire.
    pub envelope: Envelope,
    /// The decoded payload.
    pub payload: T,
}

impl<T> Event<T> {
    /// An event without routing frames.
    pub fn new(payload: T) -> Self {
        Self {
            envelope: Envelope::empty(),
            payload,
        }
    }

    /// An event published under `topic`.
    pub fn on_topic(topic: impl Into<Bytes>, payload: T) -> Self {
        Self {
            envelope: Envelope::topic(topic),
            payload,
        }
    }

    /// A reply to the router peer named by `envelope`, reusing its routing frames.
    pub fn reply_to(envelope: Envelope, payload: T) -> Self {
        Self { envelope, payload }
    }

    /// Discards the envelope.
    pub fn into_payload(self) -> T {
        self.payload
    }
}
