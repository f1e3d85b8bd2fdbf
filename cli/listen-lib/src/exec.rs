// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Locating the target command and replacing the current process image with
//! it.

use std::{
    convert::Infallible,
    env,
    ffi::{CString, OsStr, OsString},
    fs,
    io,
    iter,
    os::unix::{ffi::OsStrExt as _, fs::PermissionsExt as _},
    path::{Path, PathBuf},
    ptr,
};

use nix::{
    libc::{self, c_char},
    sys::signal::{pthread_sigmask, signal, SigHandler, SigSet, SigmaskHow, Signal},
};

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("`{}`: executable file not found in $PATH", .name.display())]
    NotFound { name: PathBuf },
    #[error("`{}`: {source}", .name.display())]
    Unusable {
        name: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`{}`: {source}", .exe.display())]
    Exec {
        exe: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{}`: execve returned", .exe.display())]
    Returned { exe: PathBuf },
}

/// Find the executable `name` using the `PATH` of the current process.
pub fn lookup(name: &OsStr) -> Result<PathBuf, LookupError> {
    lookup_in(name, env::var_os("PATH").as_deref())
}

/// Find the executable `name` in the colon-separated `search` path.
///
/// A `name` containing a `/` is not searched for, only checked. An empty
/// entry in `search` stands for the current directory. The result is
/// absolute, but symlinks are left alone.
pub fn lookup_in(name: &OsStr, search: Option<&OsStr>) -> Result<PathBuf, LookupError> {
    let name = PathBuf::from(name);
    if name.as_os_str().as_bytes().contains(&b'/') {
        return executable(&name)
            .and_then(|()| absolute(name.clone()))
            .map_err(|source| LookupError::Unusable { name, source });
    }

    for dir in search
        .filter(|s| !s.is_empty())
        .map(env::split_paths)
        .into_iter()
        .flatten()
    {
        let dir = if dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dir
        };
        let candidate = dir.join(&name);
        match executable(&candidate) {
            Ok(()) => {
                return absolute(candidate)
                    .map_err(|source| LookupError::Unusable { name, source });
            },
            Err(e) => tracing::trace!(candidate = %candidate.display(), err = %e, "skipping"),
        }
    }

    Err(LookupError::NotFound { name })
}

fn executable(path: &Path) -> io::Result<()> {
    let meta = fs::metadata(path)?;
    if meta.is_dir() {
        return Err(io::Error::new(io::ErrorKind::Other, "is a directory"));
    }
    if meta.permissions().mode() & 0o111 == 0 {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        ));
    }
    Ok(())
}

fn absolute(path: PathBuf) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Replace the current process image with `exe`.
///
/// Argument zero is `exe` itself, followed by `args`. The environment is the
/// current one, including anything published just before. Descriptors without
/// `FD_CLOEXEC` stay open in the new image.
///
/// The signal state this process changed is reset first: the Rust runtime
/// ignores `SIGPIPE`, and ignored dispositions as well as the signal mask
/// survive `execve(2)`.
///
/// Never returns `Ok`: a successful `execve(2)` does not return at all.
pub fn replace(exe: &Path, args: &[OsString]) -> Result<Infallible, Error> {
    let to_err = |source| Error::Exec {
        exe: exe.to_owned(),
        source,
    };

    let path = cstring(exe.as_os_str()).map_err(to_err)?;
    let argv = iter::once(exe.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(cstring)
        .collect::<io::Result<Vec<_>>>()
        .map_err(to_err)?;
    let envp = env::vars_os()
        .map(|(key, value)| {
            let mut var = key;
            var.push("=");
            var.push(value);
            cstring(&var)
        })
        .collect::<io::Result<Vec<_>>>()
        .map_err(to_err)?;

    let argv = nul_terminated(&argv);
    let envp = nul_terminated(&envp);

    reset_signals().map_err(|errno| to_err(io::Error::from_raw_os_error(errno as i32)))?;

    tracing::info!(exe = %exe.display(), "replacing process image");
    let ret = unsafe { libc::execve(path.as_ptr(), argv.as_ptr(), envp.as_ptr()) };
    if ret == -1 {
        Err(to_err(io::Error::last_os_error()))
    } else {
        Err(Error::Returned {
            exe: exe.to_owned(),
        })
    }
}

fn reset_signals() -> nix::Result<()> {
    unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) }?;
    pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None)
}

fn cstring(s: &OsStr) -> io::Result<CString> {
    CString::new(s.as_bytes()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn nul_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(iter::once(ptr::null()))
        .collect()
}
