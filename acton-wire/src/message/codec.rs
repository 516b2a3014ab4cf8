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

//! Pluggable payload codecs.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::message::WireError;

/// Serialization format used to turn event payloads into wire bytes and back.
///
/// Every encode or decode failure is reported as [`WireError::Serialization`], whatever
/// the underlying library's error type.
///
/// # Example
///
/// ```rust
/// use acton_wire::prelude::*;
///
/// let codec = Codec::MessagePack;
/// let bytes = codec.encode(&vec![1u8, 2, 3]).unwrap();
/// let back: Vec<u8> = codec.decode(&bytes).unwrap();
/// assert_eq!(back, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    /// JSON (UTF-8, human-readable).
    #[default]
    Json,
    /// `MessagePack` (binary, compact, self-describing).
    MessagePack,
    /// Bincode (binary, compact, Rust-to-Rust).
    Bincode,
}

impl Codec {
    /// Encodes `value` into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Serialization`] if the value cannot be represented in this format.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Bytes, WireError> {
        let encoded = match self {
            Self::Json => serde_json::to_vec(value).map_err(|e| self.failure(e)),
            Self::MessagePack => rmp_serde::to_vec_named(value).map_err(|e| self.failure(e)),
            Self::Bincode => bincode::serialize(value).map_err(|e| self.failure(e)),
        }?;
        Ok(Bytes::from(encoded))
    }

    /// Decodes bytes into a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Serialization`] if the bytes are malformed or describe a
    /// different shape than `T`.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, WireError> {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|e| self.failure(e)),
            Self::MessagePack => rmp_serde::from_slice(bytes).map_err(|e| self.failure(e)),
            Self::Bincode => bincode::deserialize(bytes).map_err(|e| self.failure(e)),
        }
    }

    fn failure(self, err: impl fmt::Display) -> WireError {
        WireError::Serialization {
            codec: self,
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("JSON"),
            Self::MessagePack => f.write_str("MessagePack"),
            Self::Bincode => f.write_str("Bincode"),
        }
    }
}
