// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Emulation of the systemd socket activation handoff.
//!
//! Binds the requested listeners, moves them to descriptors `3, 4, ...`,
//! announces them via `LISTEN_FDS` and `LISTEN_PID`, and replaces the current
//! process image with the target command. The target runs under the same pid,
//! so it sees exactly what it would see when started by `systemd`.
//!
//! See <http://0pointer.de/blog/projects/socket-activation.html> and
//! [`sd_listen_fds(3)`](https://www.freedesktop.org/software/systemd/man/sd_listen_fds.html).

use std::convert::Infallible;

use tracing::instrument;

pub mod activation;
pub mod address;
pub mod args;
pub mod config;
pub mod exec;
pub mod logging;
pub mod provision;
pub mod relocate;

/// Exit statuses of the binary.
pub mod exit {
    /// Any setup failure before the image was replaced.
    pub const FAILURE: i32 = 1;
    /// Malformed or missing arguments.
    pub const USAGE: i32 = 2;
    /// `execve` returned without reporting an error.
    pub const EXEC_RETURNED: i32 = 3;
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("cannot listen: {0}")]
    Listen(#[from] provision::Error),
    #[error("cannot duplicate listening FD: {0}")]
    Relocate(#[from] relocate::Error),
    #[error("cannot find executable: {0}")]
    Lookup(#[from] exec::LookupError),
    #[error("cannot execute command: {0}")]
    Exec(exec::Error),
    #[error("successful exec left us running!")]
    ExecReturned,
}

impl From<exec::Error> for RunError {
    fn from(e: exec::Error) -> Self {
        match e {
            exec::Error::Returned { .. } => Self::ExecReturned,
            e => Self::Exec(e),
        }
    }
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ExecReturned => exit::EXEC_RETURNED,
            _ => exit::FAILURE,
        }
    }
}

/// Run the activation pipeline.
///
/// Only ever returns an error: on success the process image is replaced by
/// the target command.
#[instrument(skip(config))]
pub fn run(config: config::Config) -> Result<Infallible, RunError> {
    let listeners = provision::bind_all(&config.listen, config.backlog)?;
    let relocated = relocate::relocate(listeners, relocate::SD_LISTEN_FDS_START)?;
    let exe = exec::lookup(&config.command.program)?;

    activation::Activation::for_current(relocated.len()).publish();

    Ok(exec::replace(&exe, &config.command.args)?)
}
