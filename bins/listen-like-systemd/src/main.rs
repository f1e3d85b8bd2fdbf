// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{env, path::Path, process};

use clap::Parser as _;

use listen_lib::{args::Args, logging, run};

fn main() {
    let config = Args::parse().into_config().unwrap_or_else(|e| e.exit());
    logging::init();
    match run(config) {
        Ok(never) => match never {},
        Err(e) => {
            eprintln!("{}: {}", prog(), e);
            process::exit(e.exit_code())
        },
    }
}

/// Name we were invoked as, for diagnostics.
fn prog() -> String {
    env::args_os()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "listen-like-systemd".to_owned())
}
