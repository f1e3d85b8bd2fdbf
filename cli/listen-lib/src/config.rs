// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::ffi::OsString;

use crate::address::ListenSpec;

/// The command replacing this process once the listeners are in place.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Command {
    pub program: OsString,
    pub args: Vec<OsString>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Listeners to hand over, in descriptor order.
    pub listen: Vec<ListenSpec>,
    pub backlog: i32,
    pub command: Command,
}
