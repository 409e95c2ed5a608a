//! Advisory locks that outlive the launcher.
//!
//! The lock file descriptor is opened without close-on-exec and never
//! closed, so the lock is held by the target until it exits.

use crate::launch::{Exclusivity, LockRequest};
use log::debug;
use nix::{
    errno::Errno,
    fcntl::{FcntlArg, FdFlag, Flock, FlockArg, fcntl},
    sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction},
    unistd::alarm,
};
use std::{
    ffi::c_int,
    fs::{File, OpenOptions},
    io,
    mem,
    os::unix::fs::OpenOptionsExt,
    path::PathBuf,
};
use thiserror::Error;

/// Errors taking a lock.
#[derive(Debug, Error)]
pub enum Error {
    /// The lock file could not be opened or created.
    #[error("unable to open lock {}: {source}", path.display())]
    Open {
        /// The lock file.
        path: PathBuf,

        /// Why it could not be opened.
        source: io::Error,
    },

    /// `flock` failed for a reason other than contention.
    #[error("unable to lock {}: {errno}", path.display())]
    Acquire {
        /// The lock file.
        path: PathBuf,

        /// The error from `flock`.
        errno: Errno,
    },

    /// A non-blocking lock is held by someone else.
    #[error("unable to lock {}: held elsewhere", path.display())]
    Busy {
        /// The lock file.
        path: PathBuf,
    },

    /// A blocking lock was not granted in time.
    #[error("unable to lock {}: timed out after {secs}s", path.display())]
    Timeout {
        /// The lock file.
        path: PathBuf,

        /// How long was waited.
        secs: u32,
    },

    /// The timeout could not be armed.
    #[error("unable to arm lock timeout: {0}")]
    Alarm(Errno),
}

/// Interrupts `flock` when the alarm fires.
extern "C" fn interrupt(_: c_int) {}

/// Arm `SIGALRM` without `SA_RESTART`, so a blocked `flock` returns EINTR.
struct Alarm {
    /// The `SIGALRM` action to put back.
    previous: SigAction,
}
impl Alarm {
    /// Install the handler and schedule the alarm.
    fn arm(secs: u32) -> Result<Self, Error> {
        let action = SigAction::new(
            SigHandler::Handler(interrupt),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // SAFETY: The handler does nothing.
        let previous = unsafe { sigaction(Signal::SIGALRM, &action) }.map_err(Error::Alarm)?;
        let _ = alarm::set(secs);
        Ok(Self { previous })
    }
}
impl Drop for Alarm {
    fn drop(&mut self) {
        let _ = alarm::cancel();
        // SAFETY: Restores whatever was installed before.
        let _ = unsafe { sigaction(Signal::SIGALRM, &self.previous) };
    }
}

/// Open the lock file so that it survives exec.
fn open(request: &LockRequest) -> Result<File, Error> {
    let fail = |source| Error::Open {
        path: request.path.clone(),
        source,
    };

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .mode(0o644)
        .open(&request.path)
        .map_err(fail)?;

    fcntl(&file, FcntlArg::F_SETFD(FdFlag::empty()))
        .map_err(|errno| fail(io::Error::from(errno)))?;
    Ok(file)
}

/// Take the lock for the rest of the process' life.
pub fn acquire(request: &LockRequest) -> Result<(), Error> {
    let file = open(request)?;
    let arg = match (request.exclusivity, request.blocking) {
        (Exclusivity::Exclusive, true) => FlockArg::LockExclusive,
        (Exclusivity::Exclusive, false) => FlockArg::LockExclusiveNonblock,
        (Exclusivity::Shared, true) => FlockArg::LockShared,
        (Exclusivity::Shared, false) => FlockArg::LockSharedNonblock,
    };

    let secs = request
        .timeout
        .filter(|_| request.blocking)
        .map(|timeout| u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX).max(1));
    let alarm = secs.map(Alarm::arm).transpose()?;
    let result = Flock::lock(file, arg);
    drop(alarm);

    let path = || request.path.clone();
    match result {
        Ok(lock) => {
            debug!("Locked {}", request.path.display());
            mem::forget(lock);
            Ok(())
        }
        Err((_, Errno::EWOULDBLOCK)) => Err(Error::Busy { path: path() }),
        Err((_, Errno::EINTR)) if secs.is_some() => Err(Error::Timeout {
            path: path(),
            secs: secs.unwrap_or_default(),
        }),
        Err((_, errno)) => Err(Error::Acquire {
            path: path(),
            errno,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::os::fd::AsRawFd;
    use tempfile::TempDir;

    #[test]
    fn creates_and_inherits() -> Result<()> {
        let dir = TempDir::new()?;
        let request = LockRequest::new(dir.path().join("lock"), false);
        let file = open(&request)?;
        assert!(request.path.exists());

        let flags = FdFlag::from_bits_truncate(fcntl(&file, FcntlArg::F_GETFD)?);
        assert!(!flags.contains(FdFlag::FD_CLOEXEC));
        assert!(file.as_raw_fd() >= 0);
        Ok(())
    }

    #[test]
    fn busy() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("lock");
        let held = Flock::lock(File::create(&path)?, FlockArg::LockExclusiveNonblock)
            .map_err(|(_, errno)| errno)?;

        let request = LockRequest::new(&path, false);
        assert!(matches!(acquire(&request), Err(Error::Busy { .. })));

        let mut shared = LockRequest::new(&path, false);
        shared.exclusivity = Exclusivity::Shared;
        assert!(matches!(acquire(&shared), Err(Error::Busy { .. })));
        drop(held);
        Ok(())
    }
}
