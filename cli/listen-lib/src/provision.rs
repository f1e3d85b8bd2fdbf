// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    ffi::CString,
    fs,
    io,
    mem,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs as _},
    os::unix::io::{AsRawFd, IntoRawFd, RawFd},
    path::Path,
    ptr,
};

use nix::libc;
use socket2::{Domain, SockAddr, Socket, Type};

use crate::address::{ListenSpec, Network};

/// Default length of the pending connections queue.
pub const DEFAULT_BACKLOG: i32 = libc::SOMAXCONN;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("listen {spec}: {source}")]
    Listen {
        spec: ListenSpec,
        #[source]
        source: io::Error,
    },
}

/// A listening socket, bound according to the spec at position `index` of
/// the address list.
#[derive(Debug)]
pub struct BoundListener {
    index: usize,
    spec: ListenSpec,
    socket: Socket,
}

impl BoundListener {
    pub fn new(index: usize, spec: ListenSpec, socket: Socket) -> Self {
        Self {
            index,
            spec,
            socket,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spec(&self) -> &ListenSpec {
        &self.spec
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }
}

impl AsRawFd for BoundListener {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl IntoRawFd for BoundListener {
    fn into_raw_fd(self) -> RawFd {
        self.socket.into_raw_fd()
    }
}

/// Bind every spec, in order.
///
/// Stops at the first failure. Listeners bound up to that point are dropped
/// with the returned error.
pub fn bind_all(specs: &[ListenSpec], backlog: i32) -> Result<Vec<BoundListener>, Error> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| bind(index, spec, backlog))
        .collect()
}

pub fn bind(index: usize, spec: &ListenSpec, backlog: i32) -> Result<BoundListener, Error> {
    let socket = match spec.path() {
        Some(path) => bind_unix(path, backlog),
        None => bind_tcp(&spec.address, backlog),
    }
    .map_err(|source| Error::Listen {
        spec: spec.clone(),
        source,
    })?;
    tracing::debug!(
        index,
        network = %spec.network,
        address = %spec.address,
        fd = socket.as_raw_fd(),
        "bound listener"
    );

    Ok(BoundListener::new(index, spec.clone(), socket))
}

fn bind_unix(path: &Path, backlog: i32) -> io::Result<Socket> {
    remove_stale(path);
    let addr = SockAddr::unix(path)?;
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    socket.bind(&addr)?;
    socket.listen(backlog)?;
    Ok(socket)
}

/// Remove whatever a previous run left at `path`, a file or an empty
/// directory.
///
/// There is usually nothing there, so failures are not fatal: if the entry
/// really is in the way, `bind` reports it.
fn remove_stale(path: &Path) {
    let removed = match fs::remove_file(path) {
        Err(e) if e.raw_os_error() == Some(libc::EISDIR) => fs::remove_dir(path),
        other => other,
    };
    match removed {
        Ok(()) => tracing::debug!(path = %path.display(), "removed stale socket path"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => tracing::warn!(path = %path.display(), err = %e, "unable to remove socket path"),
    }
}

fn bind_tcp(address: &str, backlog: i32) -> io::Result<Socket> {
    let mut last_err = None;
    for addr in resolve(address)? {
        match listen_tcp(addr, backlog) {
            Ok(socket) => return Ok(socket),
            Err(e) => {
                tracing::debug!(%addr, err = %e, "unable to bind resolved address");
                last_err = Some(e)
            },
        }
    }
    Err(last_err
        .unwrap_or_else(|| invalid_input("could not resolve to any addresses".to_owned())))
}

/// Resolve `host:port` to the addresses to try, in order.
///
/// An empty host means the wildcard address, IPv6 (dual-stack) first. An
/// empty address or port means port 0. The port may be a service name.
pub fn resolve(address: &str) -> io::Result<Vec<SocketAddr>> {
    if address.is_empty() {
        return Ok(wildcard(0));
    }
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid_input(format!("missing port in address `{}`", address)))?;
    let port = port_number(port)?;

    if host.is_empty() {
        return Ok(wildcard(port));
    }
    let host = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(host) => host,
        None if host.contains(':') => {
            return Err(invalid_input(format!(
                "too many colons in address `{}`",
                address
            )))
        },
        None => host,
    };
    Ok((host, port).to_socket_addrs()?.collect())
}

fn wildcard(port: u16) -> Vec<SocketAddr> {
    vec![
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
    ]
}

fn port_number(port: &str) -> io::Result<u16> {
    if port.is_empty() {
        Ok(0)
    } else if port.bytes().all(|b| b.is_ascii_digit()) {
        port.parse()
            .map_err(|_| invalid_input(format!("invalid port `{}`", port)))
    } else {
        service_port(port)
    }
}

/// Look up a named TCP port in the services database.
fn service_port(name: &str) -> io::Result<u16> {
    let unknown = || invalid_input(format!("unknown port `{}`", name));
    let service = CString::new(name).map_err(|_| unknown())?;

    let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
    hints.ai_family = libc::AF_INET;
    hints.ai_socktype = libc::SOCK_STREAM;
    hints.ai_flags = libc::AI_PASSIVE;

    let mut res: *mut libc::addrinfo = ptr::null_mut();
    let rc = unsafe { libc::getaddrinfo(ptr::null(), service.as_ptr(), &hints, &mut res) };
    if rc != 0 || res.is_null() {
        return Err(unknown());
    }
    // With `AF_INET` hints, every result carries a `sockaddr_in`.
    let port = unsafe {
        let addr = (*res).ai_addr as *const libc::sockaddr_in;
        if addr.is_null() {
            None
        } else {
            Some(u16::from_be((*addr).sin_port))
        }
    };
    unsafe { libc::freeaddrinfo(res) };

    port.ok_or_else(unknown)
}

fn invalid_input(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

fn listen_tcp(addr: SocketAddr, backlog: i32) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    if addr.is_ipv6() && addr.ip().is_unspecified() {
        socket.set_only_v6(false)?;
    }
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket)
}
