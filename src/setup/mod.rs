//! The setup pipeline: apply a `LaunchSpec` to the running process.
//!
//! Steps run in a fixed order, and each is fatal unless noted:
//!
//! 1. New session.
//! 2. Identity: supplementary groups, then group, then user.
//! 3. Env-identity, falling back to the identity just assumed.
//! 4. Export `UID` and `GID`.
//! 5. Change root, then change directory to the new `/` (only a warning).
//! 6. Change directory.
//! 7. Niceness.
//! 8. Resource limits; unsupported kinds are a warning.
//! 9. Lock.
//! 10. Clear the environment except the keep list, or remove the remove list.
//! 11. Environment edits.
//! 12. Close descriptors.

pub mod limits;
pub mod lock;

use crate::{Error, environ::Environment, launch::LaunchSpec};
use log::{debug, warn};
use nix::{
    errno::Errno,
    libc,
    unistd::{chdir, chroot, setsid},
};
use std::os::fd::RawFd;
use user::Identity;

/// The per-process state the pipeline changes.
///
/// The environment is held here as a value rather than in `environ`, so
/// the target receives exactly what the pipeline produced. Everything else
/// (session, credentials, root, directory, limits, descriptors) is live
/// process state, changed in place.
#[derive(Debug)]
pub struct Process {
    /// The environment the target will receive.
    env: Environment,
}
impl Process {
    /// Take hold of the running process, snapshotting its environment.
    pub fn current() -> Self {
        Self::with_env(Environment::current())
    }

    /// A process whose environment starts as `env`.
    pub fn with_env(env: Environment) -> Self {
        Self { env }
    }

    /// The environment as edited so far.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Hand the final environment to the exec step.
    pub fn into_env(self) -> Environment {
        self.env
    }
}

/// Apply every step of `spec` to `process`.
pub fn apply(spec: &LaunchSpec, process: &mut Process) -> Result<(), Error> {
    if spec.new_session {
        let _ = setsid().map_err(Error::Session)?;
        debug!("Started a new session");
    }

    if let Some(identity) = &spec.identity {
        identity.assume()?;
    }

    if let Some(identity) = env_identity(spec) {
        process.env.set("UID", identity.uid().to_string());
        process.env.set("GID", identity.primary().to_string());
    }

    if let Some(root) = &spec.chroot {
        chroot(root).map_err(|errno| Error::Chroot(root.clone(), errno))?;
        if let Err(errno) = chdir("/") {
            warn!("Failed to change directory to the new root: {errno}");
        }
        debug!("Changed root to {}", root.display());
    }

    if let Some(dir) = &spec.work_dir {
        chdir(dir).map_err(|errno| Error::Chdir(dir.clone(), errno))?;
    }

    if spec.nice != 0 {
        nice(spec.nice)?;
    }

    for (kind, limit) in &spec.limits {
        limits::apply(*kind, *limit)?;
    }

    if let Some(request) = &spec.lock {
        match lock::acquire(request) {
            Err(lock::Error::Busy { path }) if request.quiet_busy => {
                return Err(Error::Busy(path));
            }
            result => result?,
        }
    }

    if spec.clear_environment {
        process.env.clear_keeping(&spec.keep);
    } else {
        for key in &spec.remove {
            process.env.unset(key);
        }
    }

    process.env.apply(&spec.edits);

    for fd in &spec.close {
        close(*fd)?;
    }

    Ok(())
}

/// The identity to export: the one asked for, or else the one assumed.
fn env_identity(spec: &LaunchSpec) -> Option<&Identity> {
    spec.env_identity.as_ref().or(spec.identity.as_ref())
}

/// Close a descriptor the target should not inherit.
fn close(fd: RawFd) -> Result<(), Error> {
    // SAFETY: The descriptor is not owned by anything in this process.
    Errno::result(unsafe { libc::close(fd) })
        .map(drop)
        .map_err(|errno| Error::Close(fd, errno))
}

/// Adjust niceness. `nice(2)` can legitimately return -1, so only errno
/// tells failure apart.
fn nice(delta: i32) -> Result<(), Error> {
    Errno::clear();
    // SAFETY: nice has no memory safety requirements.
    let niceness = unsafe { libc::nice(delta) };
    match Errno::last() {
        Errno::UnknownErrno => {
            debug!("Niceness is now {niceness}");
            Ok(())
        }
        errno => Err(Error::Nice(errno)),
    }
}
