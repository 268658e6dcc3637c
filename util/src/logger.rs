//! # Bridge logging
//!
//! Log records go to two sinks:
//!
//! - stderr, with coloured level tags, for whoever runs the bridge. Stdout carries the reply
//!   frames so nothing is ever logged there.
//! - the session's log file, with plain tags so the file stays greppable.
//!
//! Every line is stamped with the seconds elapsed since the session epoch. Records at debug level
//! and below also name the module which emitted them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::fmt;
use log::{self, info, Level};
use colored::{ColoredString, Colorize};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while setting up the bridge logging.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Logging must at least include INFO records, got `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been installed: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Install the logger for this session.
///
/// `min_level` is the most verbose level kept. It can't be below `Info`, otherwise frame
/// fallbacks and the session summary would be lost.
///
/// Only one logger can be installed per process, a second call returns `FernInitError`.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let console = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!(
            "{}",
            Line::new(record.level(), record.target(), message, colour_tag(record.level()))
        )))
        .chain(std::io::stderr());

    let file = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!(
            "{}",
            Line::new(record.level(), record.target(), message, plain_tag(record.level()))
        )))
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!(
        "Logging to stderr and {:?} at {:?} (epoch {})",
        session.log_file_path, min_level, session::get_epoch()
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE ITEMS
// ---------------------------------------------------------------------------

/// A single formatted log line.
struct Line<'a, T: fmt::Display> {
    elapsed_s: f64,
    level: Level,
    target: &'a str,
    message: &'a fmt::Arguments<'a>,
    tag: T
}

impl<'a, T: fmt::Display> Line<'a, T> {
    fn new(level: Level, target: &'a str, message: &'a fmt::Arguments<'a>, tag: T) -> Self {
        Self {
            elapsed_s: session::get_elapsed_seconds(),
            level,
            target,
            message,
            tag
        }
    }
}

impl<'a, T: fmt::Display> fmt::Display for Line<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:10.6} {}] ", self.elapsed_s, self.tag)?;

        if self.level > Level::Info {
            write!(f, "{}: ", self.target)?;
        }

        write!(f, "{}", self.message)
    }
}

fn plain_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info  => "INF",
        Level::Warn  => "WRN",
        Level::Error => "ERR"
    }
}

fn colour_tag(level: Level) -> ColoredString {
    let tag = plain_tag(level);

    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info  => tag.normal(),
        Level::Warn  => tag.yellow(),
        Level::Error => tag.red().bold()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
