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

//! Address parsing and builders for the transport schemes Acton Wire accepts.

use std::fmt;

use crate::message::WireError;

/// Transport scheme of an endpoint address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// In-process (same context only).
    Inproc,
    /// Unix domain socket.
    Ipc,
    /// TCP.
    Tcp,
    /// Reliable multicast over raw IP.
    Pgm,
    /// Reliable multicast encapsulated in UDP.
    Epgm,
}

impl Scheme {
    /// The URI prefix of the scheme, without `://`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inproc => "inproc",
            Self::Ipc => "ipc",
            Self::Tcp => "tcp",
            Self::Pgm => "pgm",
            Self::Epgm => "epgm",
        }
    }

    /// Whether the scheme is a multicast transport.
    #[must_use]
    pub const fn is_multicast(self) -> bool {
        matches!(self, Self::Pgm | Self::Epgm)
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "inproc" => Some(Self::Inproc),
            "ipc" => Some(Self::Ipc),
            "tcp" => Some(Self::Tcp),
            "pgm" => Some(Self::Pgm),
            "epgm" => Some(Self::Epgm),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A syntactically valid `scheme://location` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedAddress<'a> {
    pub(crate) scheme: Scheme,
    pub(crate) location: &'a str,
}

impl<'a> ParsedAddress<'a> {
    /// Parses `address`, checking the per-scheme location syntax.
    pub(crate) fn parse(address: &'a str) -> Result<Self, WireError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(WireError::configuration("address is empty"));
        }
        let Some((scheme, location)) = address.split_once("://") else {
            return Err(WireError::configuration(format!(
                "address '{address}' is not of the form scheme://location"
            )));
        };
        let scheme = Scheme::parse(scheme).ok_or_else(|| {
            WireError::configuration(format!("unsupported transport scheme '{scheme}'"))
        })?;
        if location.is_empty() {
            return Err(WireError::configuration(format!(
                "address '{address}' has no location"
            )));
        }

        match scheme {
            Scheme::Tcp => {
                host_and_port(location, ':', address)?;
            }
            Scheme::Pgm | Scheme::Epgm => {
                multicast_group(location, address)?;
            }
            Scheme::Inproc | Scheme::Ipc => {}
        }

        Ok(Self { scheme, location })
    }

    /// Whether the address contains a wildcard host or port, which only binding can resolve.
    pub(crate) fn is_wildcard(&self) -> bool {
        match self.scheme {
            Scheme::Tcp => host_and_port(self.location, ':', self.location)
                .is_ok_and(|(host, port)| host == "*" || port == "*" || port == "0"),
            Scheme::Ipc => self.location == "*",
            _ => false,
        }
    }
}

fn host_and_port<'a>(
    location: &'a str,
    separator: char,
    address: &str,
) -> Result<(&'a str, &'a str), WireError> {
    let (host, port) = location.rsplit_once(separator).ok_or_else(|| {
        WireError::configuration(format!("address '{address}' is missing a port"))
    })?;
    if host.is_empty() {
        return Err(WireError::configuration(format!(
            "address '{address}' is missing a host"
        )));
    }
    if port != "*" && port.parse::<u16>().is_err() {
        return Err(WireError::configuration(format!(
            "address '{address}' has an invalid port '{port}'"
        )));
    }
    Ok((host, port))
}

/// Splits an `interface;group:port` multicast location into interface, group and port.
fn multicast_group<'a>(
    location: &'a str,
    address: &str,
) -> Result<(&'a str, &'a str, u16), WireError> {
    let (interface, group) = location.split_once(';').ok_or_else(|| {
        WireError::configuration(format!(
            "multicast address '{address}' must be of the form interface;group:port"
        ))
    })?;
    if interface.is_empty() {
        return Err(WireError::configuration(format!(
            "address '{address}' is missing an interface"
        )));
    }
    let (group, port) = host_and_port(group, ':', address)?;
    let port = port.parse::<u16>().map_err(|_| {
        WireError::configuration(format!("multicast address '{address}' needs a concrete port"))
    })?;
    Ok((interface, group, port))
}

/// Builds an `inproc://` address.
#[must_use]
pub fn inproc(reference: &str) -> String {
    format!("{}://{reference}", Scheme::Inproc)
}

/// Builds an `ipc://` address backed by `/tmp/<reference>.ipc`.
#[must_use]
pub fn ipc(reference: &str) -> String {
    format!("{}:///tmp/{reference}.ipc", Scheme::Ipc)
}

/// Builds a `tcp://host:port` address.
#[must_use]
pub fn tcp(host: &str, port: u16) -> String {
    format!("{}://{host}:{port}", Scheme::Tcp)
}

/// Builds a `pgm://interface;group:port` multicast address.
#[must_use]
pub fn pgm(interface: &str, group: &str, port: u16) -> String {
    format!("{}://{interface};{group}:{port}", Scheme::Pgm)
}

/// Builds an `epgm://interface;group:port` multicast address.
#[must_use]
pub fn epgm(interface: &str, group: &str, port: u16) -> String {
    format!("{}://{interface};{group}:{port}", Scheme::Epgm)
}
