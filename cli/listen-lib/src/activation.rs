// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::env;

use nix::unistd::Pid;

/// Environment variable which carries the amount of file descriptors passed
/// down.
pub const LISTEN_FDS: &str = "LISTEN_FDS";
/// Environment variable which must match the PID of the receiving process.
pub const LISTEN_PID: &str = "LISTEN_PID";

/// The environment announcing relocated listeners to the next process image.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Activation {
    pub fds: usize,
    pub pid: Pid,
}

impl Activation {
    /// `fds` descriptors handed to whatever replaces the current process.
    ///
    /// `execve(2)` keeps the pid, so the current one is what the receiver
    /// will compare `LISTEN_PID` against.
    pub fn for_current(fds: usize) -> Self {
        Self {
            fds,
            pid: Pid::this(),
        }
    }

    pub fn vars(&self) -> [(&'static str, String); 2] {
        [
            (LISTEN_FDS, self.fds.to_string()),
            (LISTEN_PID, self.pid.to_string()),
        ]
    }

    /// Set the variables in the process environment, which the replacing
    /// image inherits.
    pub fn publish(&self) {
        for (key, value) in self.vars() {
            tracing::debug!(key, %value, "publishing activation variable");
            env::set_var(key, value);
        }
    }
}
