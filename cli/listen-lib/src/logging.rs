// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{env, io};

use tracing::subscriber::set_global_default as set_subscriber;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Filter applied when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "warn";

/// Initialise logging / tracing
///
/// Output goes to stderr, stdout belongs to the command we exec. `RUST_LOG`
/// selects what is logged, defaulting to warnings only.
///
/// The `TRACING_FMT` environment variable can be used to control the log
/// formatting. Supported values:
///
/// * "pretty": [`tracing_subscriber::fmt::format::Pretty`]
/// * "compact": [`tracing_subscriber::fmt::format::Compact`]
/// * "json": [`tracing_subscriber::fmt::format::Json`]
///
/// If the variable is not set, or set to any other value, the
/// [`tracing_subscriber::fmt::format::Full`] format is used.
///
/// The environment is inherited by the exec'd command, so nothing is written
/// back to it here.
pub fn init() {
    let builder = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(io::stderr);

    let res = match env::var("TRACING_FMT").ok().as_deref() {
        Some("pretty") => set_subscriber(builder.pretty().finish()),
        Some("compact") => set_subscriber(builder.compact().finish()),
        Some("json") => set_subscriber(builder.json().flatten_event(true).finish()),
        _ => set_subscriber(builder.finish()),
    };
    if let Err(e) = res {
        eprintln!("setting tracing subscriber failed: {}", e);
    }
}
