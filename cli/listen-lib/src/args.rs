// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::ffi::OsString;

use clap::{CommandFactory as _, ErrorKind, Parser};

use crate::{
    address,
    config::{Command, Config},
    provision::DEFAULT_BACKLOG,
};

/// Pass listening sockets to CMD the way systemd socket activation does.
///
/// The sockets are placed on file descriptors 3, 4, ... in the order given,
/// and announced through LISTEN_FDS and LISTEN_PID. CMD then replaces this
/// process, keeping its pid.
#[derive(Debug, Eq, PartialEq, Parser)]
#[clap(
    name = "listen-like-systemd",
    override_usage = "listen-like-systemd [OPTIONS] [IP]:PORT[,...]|/PATH[,...] CMD [ARG]...",
    trailing_var_arg = true
)]
pub struct Args {
    /// Length of the pending connections queue of each listener.
    #[clap(long, default_value_t = DEFAULT_BACKLOG)]
    pub backlog: i32,

    /// ADDRS, then CMD and its arguments.
    ///
    /// ADDRS is a comma-separated list of addresses to listen on. Entries
    /// starting with '/' are unix domain socket paths, anything else is a TCP
    /// `host:port`. Options are only recognised before ADDRS: everything
    /// after it, including `--`, is passed to CMD as given.
    #[clap(
        value_name = "ADDRS|CMD|ARG",
        parse(from_os_str),
        required = true,
        min_values = 2,
        multiple_values = true,
        allow_hyphen_values = true
    )]
    pub operands: Vec<OsString>,
}

impl Args {
    pub fn into_config(self) -> Result<Config, clap::Error> {
        let mut operands = self.operands.into_iter();
        let (addrs, program) = match (operands.next(), operands.next()) {
            (Some(addrs), Some(program)) => (addrs, program),
            _ => {
                return Err(Self::command().error(
                    ErrorKind::TooFewValues,
                    "both ADDRS and CMD are required",
                ))
            },
        };
        let addrs = addrs.into_string().map_err(|addrs| {
            Self::command().error(
                ErrorKind::InvalidUtf8,
                format!("invalid UTF-8 in ADDRS: {:?}", addrs),
            )
        })?;

        Ok(Config {
            listen: address::parse_list(&addrs),
            backlog: self.backlog,
            command: Command {
                program,
                args: operands.collect(),
            },
        })
    }
}
