// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Moving listeners onto the descriptor numbers the activation protocol
//! reserves for them.
//!
//! The listener at position `i` ends up on `start + i`, where `start` is
//! [`SD_LISTEN_FDS_START`] for real activation. Relocated descriptors do not
//! have `FD_CLOEXEC` set, so they survive `execve(2)`. They are never closed
//! by this process: ownership passes to the replacing image.

use std::{
    convert::TryFrom,
    ops::Range,
    os::unix::io::{IntoRawFd, RawFd},
};

use nix::{
    fcntl::{fcntl, FcntlArg, FdFlag},
    unistd::{close, dup2},
};

use crate::provision::BoundListener;

/// Number of the first passed file descriptor. `0`, `1` and `2` keep their
/// stdio roles.
pub const SD_LISTEN_FDS_START: RawFd = 3;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{count} descriptors starting at {start} overflow the descriptor range")]
    Overflow { start: RawFd, count: usize },
    #[error("cannot move FD {fd} out of the way: {source}")]
    Evacuate {
        fd: RawFd,
        #[source]
        source: nix::Error,
    },
    #[error("cannot duplicate FD {fd} onto {target}: {source}")]
    Duplicate {
        fd: RawFd,
        target: RawFd,
        #[source]
        source: nix::Error,
    },
    #[error("cannot clear close-on-exec on FD {fd}: {source}")]
    Inherit {
        fd: RawFd,
        #[source]
        source: nix::Error,
    },
    #[error("cannot close FD {fd}: {source}")]
    Close {
        fd: RawFd,
        #[source]
        source: nix::Error,
    },
}

/// A listener after relocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Relocated {
    /// Position in the address list.
    pub index: usize,
    pub fd: RawFd,
}

/// Relocate `listeners` onto `start, start + 1, ...` in the order given.
///
/// Whatever occupies a target slot is overwritten.
pub fn relocate(listeners: Vec<BoundListener>, start: RawFd) -> Result<Vec<Relocated>, Error> {
    let range = target_range(start, listeners.len())?;
    let mut fds = listeners
        .into_iter()
        .map(IntoRawFd::into_raw_fd)
        .collect::<Vec<_>>();

    // An original sitting on someone else's slot would be clobbered before
    // its own turn.
    for (target, fd) in range.clone().zip(fds.iter_mut()) {
        if range.contains(&*fd) && *fd != target {
            *fd = evacuate(*fd, range.end)?;
        }
    }

    range
        .zip(fds)
        .enumerate()
        .map(|(index, (target, fd))| {
            place(fd, target)?;
            tracing::debug!(index, from = fd, fd = target, "relocated listener");
            Ok(Relocated { index, fd: target })
        })
        .collect()
}

/// Whether `fd` is open and will be inherited across `execve(2)`.
pub fn is_inheritable(fd: RawFd) -> nix::Result<bool> {
    let flags = FdFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFD)?);
    Ok(!flags.contains(FdFlag::FD_CLOEXEC))
}

fn target_range(start: RawFd, count: usize) -> Result<Range<RawFd>, Error> {
    let end = RawFd::try_from(count)
        .ok()
        .and_then(|n| start.checked_add(n))
        .ok_or(Error::Overflow { start, count })?;
    Ok(start..end)
}

fn evacuate(fd: RawFd, above: RawFd) -> Result<RawFd, Error> {
    let moved = fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(above))
        .map_err(|source| Error::Evacuate { fd, source })?;
    close(fd).map_err(|source| Error::Close { fd, source })?;
    tracing::trace!(fd, to = moved, "moved listener out of the target range");
    Ok(moved)
}

fn place(fd: RawFd, target: RawFd) -> Result<(), Error> {
    if fd == target {
        // dup2 onto itself is a no-op and would leave FD_CLOEXEC in place
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))
            .map_err(|source| Error::Inherit { fd, source })?;
    } else {
        dup2(fd, target).map_err(|source| Error::Duplicate { fd, target, source })?;
        close(fd).map_err(|source| Error::Close { fd, source })?;
    }
    Ok(())
}
