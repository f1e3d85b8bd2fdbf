// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use proptest::prelude::*;

/// A single `host:port` entry. Never contains the list separator.
pub fn tcp_address() -> impl Strategy<Value = String> {
    prop_oneof![
        (any::<[u8; 4]>(), any::<u16>())
            .prop_map(|([a, b, c, d], port)| format!("{}.{}.{}.{}:{}", a, b, c, d, port)),
        any::<u16>().prop_map(|port| format!(":{}", port)),
        ("[a-z]{1,12}", any::<u16>()).prop_map(|(host, port)| format!("{}:{}", host, port)),
    ]
}

/// An absolute socket path. Never contains the list separator.
pub fn unix_address() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zA-Z0-9_.-]{1,8}", 1..4)
        .prop_map(|components| format!("/{}", components.join("/")))
}

pub fn address() -> impl Strategy<Value = String> {
    prop_oneof![tcp_address(), unix_address()]
}

pub fn address_list() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(address(), 1..16)
}
