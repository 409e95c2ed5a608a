//! Forking primitives shared by the supervisor and its traps.

use crate::{EXEC_FAILURE, Prepared, signal};
use log::{error, warn};
use nix::{
    libc,
    unistd::{ForkResult, fork},
};
use std::{ffi::c_int, thread::sleep, time::Duration};

/// The first pause after a failed fork.
const BACKOFF: Duration = Duration::from_millis(50);

/// The longest pause between attempts.
const BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Fork, retrying until it succeeds. Fork only fails on resource
/// exhaustion, which is expected to pass.
pub(crate) fn retrying(what: &str) -> ForkResult {
    let mut delay = BACKOFF;
    loop {
        // SAFETY: Callers are single-threaded, and the child only resets
        // signal dispositions before exec.
        match unsafe { fork() } {
            Ok(result) => return result,
            Err(errno) => {
                warn!("Failed to fork {what}: {errno}; retrying in {delay:?}");
                sleep(delay);
                delay = (delay * 2).min(BACKOFF_MAX);
            }
        }
    }
}

/// Put back the dispositions the supervisor started with: ignored if they
/// were ignored, default otherwise.
fn reset_signals(ignored: &[c_int]) {
    for signo in signal::catchable() {
        let handler = if ignored.contains(&signo) {
            libc::SIG_IGN
        } else {
            libc::SIG_DFL
        };
        // SAFETY: Setting a disposition to default or ignore is async-signal-safe.
        unsafe { libc::signal(signo, handler) };
    }
}

/// The child side of a fork: exec the target, or exit with `EXEC_FAILURE`.
pub(crate) fn exec_child(prepared: &Prepared, ignored: &[c_int]) -> ! {
    reset_signals(ignored);
    let error = prepared.exec();
    error!("{error}");
    // SAFETY: Leaves the forked child without running the parent's exit handlers.
    unsafe { libc::_exit(EXEC_FAILURE) }
}
