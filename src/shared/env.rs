//! Environment variables the launcher itself reads.
//!
//! These come from the launcher's own environment, not from the edited
//! environment handed to the target.

use log::LevelFilter;
use std::{env, path::PathBuf, sync::LazyLock};

/// The base log level, set by the RUST_LOG environment variable.
pub static LEVEL: LazyLock<LevelFilter> = LazyLock::new(|| match env::var("RUST_LOG") {
    Ok(e) => match e.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    },
    Err(_) => LevelFilter::Warn,
});

/// The shell to wrap commands in when the identity has none.
pub static SHELL: LazyLock<PathBuf> = LazyLock::new(|| {
    env::var_os("SHELL")
        .filter(|shell| !shell.is_empty())
        .map_or_else(|| PathBuf::from("/bin/sh"), PathBuf::from)
});
