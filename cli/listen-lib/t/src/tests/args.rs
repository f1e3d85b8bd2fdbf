// Copyright © 2022 The Radicle Link Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::ffi::OsString;

use anyhow::Result;
use clap::{ErrorKind, Parser as _};
use pretty_assertions::assert_eq;

use listen_lib::{
    address::{ListenSpec, Network},
    args::Args,
    config::{Command, Config},
    provision::DEFAULT_BACKLOG,
};

fn os(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

#[test]
fn defaults() -> Result<()> {
    #[rustfmt::skip]
    let iter = vec![
        "listen-like-systemd",
            "127.0.0.1:8080",
            "server",
    ];
    let parsed = Args::try_parse_from(iter)?;

    assert_eq!(
        parsed,
        Args {
            backlog: DEFAULT_BACKLOG,
            operands: os(&["127.0.0.1:8080", "server"]),
        }
    );

    Ok(())
}

#[test]
fn backlog() -> Result<()> {
    #[rustfmt::skip]
    let iter = vec![
        "listen-like-systemd",
            "--backlog", "16",
            "/tmp/app.sock",
            "server",
    ];
    let parsed = Args::try_parse_from(iter)?;
    assert_eq!(parsed.backlog, 16);

    Ok(())
}

#[test]
fn command_flags_are_not_ours() -> Result<()> {
    #[rustfmt::skip]
    let iter = vec![
        "listen-like-systemd",
            "127.0.0.1:0",
            "sh", "-c", "echo $LISTEN_FDS", "--backlog", "-h",
    ];
    let config = Args::try_parse_from(iter)?.into_config()?;

    assert_eq!(config.backlog, DEFAULT_BACKLOG);
    assert_eq!(config.command.program, OsString::from("sh"));
    assert_eq!(
        config.command.args,
        os(&["-c", "echo $LISTEN_FDS", "--backlog", "-h"])
    );

    Ok(())
}

#[test]
fn double_dash_after_command_is_forwarded() -> Result<()> {
    #[rustfmt::skip]
    let iter = vec![
        "listen-like-systemd",
            "127.0.0.1:0",
            "rsync", "--", "file",
    ];
    let config = Args::try_parse_from(iter)?.into_config()?;

    assert_eq!(config.command.program, OsString::from("rsync"));
    assert_eq!(config.command.args, os(&["--", "file"]));

    Ok(())
}

#[test]
fn options_end_at_addrs() -> Result<()> {
    #[rustfmt::skip]
    let iter = vec![
        "listen-like-systemd",
            "127.0.0.1:0",
            "--backlog", "5", "cmd",
    ];
    let config = Args::try_parse_from(iter)?.into_config()?;

    assert_eq!(config.backlog, DEFAULT_BACKLOG);
    assert_eq!(config.command.program, OsString::from("--backlog"));
    assert_eq!(config.command.args, os(&["5", "cmd"]));

    Ok(())
}

#[test]
fn double_dash_before_addrs_ends_options() -> Result<()> {
    #[rustfmt::skip]
    let iter = vec![
        "listen-like-systemd",
            "--backlog", "8", "--",
            "127.0.0.1:0", "cmd", "--",
    ];
    let config = Args::try_parse_from(iter)?.into_config()?;

    assert_eq!(config.backlog, 8);
    assert_eq!(config.command.program, OsString::from("cmd"));
    assert_eq!(config.command.args, os(&["--"]));

    Ok(())
}

#[test]
fn missing_command() {
    let err = Args::try_parse_from(vec!["listen-like-systemd", "127.0.0.1:0"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooFewValues);
}

#[test]
fn missing_everything() {
    let err = Args::try_parse_from(vec!["listen-like-systemd"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn unknown_flag() {
    let err = Args::try_parse_from(vec!["listen-like-systemd", "--nope", "127.0.0.1:0", "cmd"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownArgument);
}

#[test]
fn help_lists_defaults() {
    let err = Args::try_parse_from(vec!["listen-like-systemd", "-h"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    let help = err.to_string();
    assert!(help.contains("--backlog"), "{}", help);
    assert!(
        help.contains(&format!("[default: {}]", DEFAULT_BACKLOG)),
        "{}",
        help
    );
}

#[test]
fn into_config() -> Result<()> {
    #[rustfmt::skip]
    let iter = vec![
        "listen-like-systemd",
            "127.0.0.1:0,/tmp/app.sock",
            "server", "--port-from-env",
    ];
    let config = Args::try_parse_from(iter)?.into_config()?;

    assert_eq!(
        config,
        Config {
            listen: vec![
                ListenSpec {
                    network: Network::Tcp,
                    address: "127.0.0.1:0".to_owned(),
                },
                ListenSpec {
                    network: Network::Unix,
                    address: "/tmp/app.sock".to_owned(),
                },
            ],
            backlog: DEFAULT_BACKLOG,
            command: Command {
                program: "server".into(),
                args: os(&["--port-from-env"]),
            },
        }
    );

    Ok(())
}

#[test]
fn non_utf8_addrs_is_a_usage_error() {
    use std::os::unix::ffi::OsStringExt as _;

    let args = Args {
        backlog: DEFAULT_BACKLOG,
        operands: vec![OsString::from_vec(vec![b'/', 0xff]), "server".into()],
    };
    let err = args.into_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUtf8);
}
