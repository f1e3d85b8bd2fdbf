// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{fmt, path::Path};

/// Separator of the entries in an address list.
pub const SEPARATOR: char = ',';

/// The kind of socket a [`ListenSpec`] asks for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Network {
    /// Stream socket over IP, addressed as `host:port`.
    Tcp,
    /// Stream socket bound to a filesystem path.
    Unix,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let network = match self {
            Self::Tcp => "tcp",
            Self::Unix => "unix",
        };
        write!(f, "{}", network)
    }
}

/// One requested listen target.
///
/// The address is not validated here. Malformed `host:port` entries only
/// surface when binding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListenSpec {
    pub network: Network,
    pub address: String,
}

impl ListenSpec {
    /// Classify a single address: absolute paths are [`Network::Unix`],
    /// everything else is [`Network::Tcp`].
    pub fn parse(address: &str) -> Self {
        let network = if address.starts_with('/') {
            Network::Unix
        } else {
            Network::Tcp
        };
        Self {
            network,
            address: address.to_owned(),
        }
    }

    /// The socket path, if this is a [`Network::Unix`] spec.
    pub fn path(&self) -> Option<&Path> {
        match self.network {
            Network::Unix => Some(Path::new(&self.address)),
            Network::Tcp => None,
        }
    }
}

impl fmt::Display for ListenSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.network, self.address)
    }
}

/// Split a comma-separated address list into specs.
///
/// Order is preserved, as it determines the descriptor each listener ends up
/// on. Duplicates and empty entries are kept. The result is never empty.
pub fn parse_list(list: &str) -> Vec<ListenSpec> {
    list.split(SEPARATOR).map(ListenSpec::parse).collect()
}
