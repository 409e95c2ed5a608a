//! A `log::Log` implementation writing `name: level: message` to stderr.

use crate::shared::env::LEVEL;
use console::{StyledObject, style};
use log::{Level, LevelFilter};
use std::{
    io::{Write, stderr},
    sync::OnceLock,
};

/// The global Logger
static LOGGER: Logger = Logger::new();

/// The name messages are prefixed with: the personality we run as.
static NAME: OnceLock<String> = OnceLock::new();

/// The label of a level, colored when stderr is a terminal.
fn level_color(level: Level) -> StyledObject<&'static str> {
    let label = match level {
        Level::Error => style("error").red().bold(),
        Level::Warn => style("warning").yellow().bold(),
        Level::Info => style("info").green(),
        Level::Debug => style("debug").blue(),
        Level::Trace => style("trace").dim(),
    };
    label.for_stderr()
}

/// Writes records to stderr, prefixed with `NAME`.
struct Logger {}
impl Logger {
    /// The logger, usable in a static.
    const fn new() -> Self {
        Self {}
    }
}
impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let name = NAME.get().map_or("envmod", String::as_str);
        let mut msg = format!("{name}: {}: {}", level_color(record.level()), record.args());
        if !msg.ends_with('\n') {
            msg.push('\n');
        }
        let _ = stderr().lock().write_all(msg.as_bytes());
    }

    fn flush(&self) {}
}

/// Install the logger, prefixing messages with `name`.
pub fn init(name: &str) {
    let _ = NAME.set(name.to_owned());
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(*LEVEL);
    }
}

/// The level after `verbosity` uses of `-v`. Never quieter than RUST_LOG.
pub fn verbose_level(base: LevelFilter, verbosity: u8) -> LevelFilter {
    let requested = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if verbosity == 0 { base } else { base.max(requested) }
}

/// Raise the level for `verbosity` uses of `-v`.
pub fn verbose(verbosity: u8) {
    log::set_max_level(verbose_level(*LEVEL, verbosity));
}
