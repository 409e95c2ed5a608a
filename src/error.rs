//! Launcher errors and the exit codes they map to.
//!
//! Codes are grouped so that a caller can tell a bad configuration
//! (`USAGE`) from a failed setup step (`SETUP`), from a target that could
//! not run (`spawn::EXEC_FAILURE`), from a child that misbehaved
//! (`spawn::SIGNALED`, `spawn::ABNORMAL`).

use crate::{environ, launch::ResourceKind, setup::lock};
use nix::errno::Errno;
use std::{os::fd::RawFd, path::PathBuf};
use thiserror::Error;

/// The configuration was invalid.
pub const USAGE: i32 = 100;

/// A setup step failed.
pub const SETUP: i32 = 111;

/// Everything that can stop a launch.
#[derive(Debug, Error)]
pub enum Error {
    /// The arguments do not make a valid plan.
    #[error("{0}")]
    Usage(String),

    /// An identity argument could not be resolved.
    #[error("invalid identity '{spec}': {source}")]
    Identity {
        /// The argument as given.
        spec: String,

        /// What was wrong with it.
        source: user::ParseError,
    },

    /// An environment directory or file could not be loaded.
    #[error(transparent)]
    Environment(#[from] environ::Error),

    /// A new session could not be started.
    #[error("setsid: {0}")]
    Session(Errno),

    /// The identity could not be assumed.
    #[error(transparent)]
    Privilege(#[from] user::Error),

    /// The root could not be changed.
    #[error("unable to change root to {}: {}", .0.display(), .1)]
    Chroot(PathBuf, Errno),

    /// The working directory could not be changed.
    #[error("unable to change directory to {}: {}", .0.display(), .1)]
    Chdir(PathBuf, Errno),

    /// Niceness could not be adjusted.
    #[error("unable to adjust niceness: {0}")]
    Nice(Errno),

    /// A resource limit could not be read or set.
    #[error("unable to set {0} limit: {1}")]
    Limit(ResourceKind, Errno),

    /// The lock could not be taken.
    #[error(transparent)]
    Lock(#[from] lock::Error),

    /// The lock was held elsewhere, and that was asked to be silent.
    #[error("{} is locked", .0.display())]
    Busy(PathBuf),

    /// A descriptor could not be closed.
    #[error("unable to close descriptor {0}: {1}")]
    Close(RawFd, Errno),

    /// The target could not be run or supervised.
    #[error(transparent)]
    Exec(#[from] spawn::Error),
}
impl Error {
    /// The status to exit with.
    pub fn code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Identity { .. } => USAGE,
            Self::Environment(e) if e.is_config() => USAGE,
            Self::Busy(_) => 0,
            Self::Exec(spawn::Error::Signals(_)) => SETUP,
            Self::Exec(spawn::Error::Wait(_)) => spawn::ABNORMAL,
            Self::Exec(_) => spawn::EXEC_FAILURE,
            _ => SETUP,
        }
    }
}
