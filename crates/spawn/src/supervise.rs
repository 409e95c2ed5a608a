//! The signal-relay supervisor.
//!
//! The supervisor catches every signal it can, forks the target, and then
//! decides per signal whether to run a trap, drop it, or pass it on to the
//! child. It returns once the child has been collected.

use crate::{ABNORMAL, Error, Prepared, SIGNALED, fork, signal, trap};
use log::{debug, info, warn};
use nix::{
    errno::Errno,
    sys::wait::{WaitPidFlag, WaitStatus, waitpid},
    unistd::{ForkResult, Pid},
};
use signal_hook::{consts::SIGCHLD, iterator::Signals};
use std::{collections::BTreeMap, ffi::c_int, iter};

/// What to do with a signal instead of forwarding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Drop the signal.
    Ignore,

    /// Run a shell command.
    Trap(String),
}

/// Signal number to action. Signals without an entry are forwarded.
pub type Policy = BTreeMap<c_int, Action>;

/// How the supervised child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exited with a status.
    Exited(i32),

    /// Killed by a signal it did not handle.
    Signaled(c_int),

    /// Disappeared, or terminated in a way that could not be decoded.
    Abnormal,
}
impl Outcome {
    /// The status the supervisor should exit with.
    pub fn code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Signaled(_) => SIGNALED,
            Self::Abnormal => ABNORMAL,
        }
    }
}

/// Where the supervisor is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Handlers installed, no child yet.
    Unforked,

    /// The target is running.
    Forked(Pid),

    /// Relaying signals until the target is collected.
    Waiting(Pid),

    /// The target was collected.
    Terminated(Outcome),
}

/// Fork a target and relay signals to it.
#[derive(Debug)]
pub struct Supervisor {
    /// Signals that are not forwarded.
    policy: Policy,

    /// Where the supervisor is.
    state: State,

    /// Signals ignored when the supervisor started. Children get them back
    /// as ignored, exactly as a plain exec would have passed them on.
    ignored: Vec<c_int>,
}
impl Supervisor {
    /// A supervisor applying `policy`. Unlisted signals are forwarded.
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            state: State::Unforked,
            ignored: Vec::new(),
        }
    }

    /// Install handlers, fork `target`, and relay signals until the child
    /// is collected.
    ///
    /// Must be called from a single-threaded process: every child of the
    /// process is reaped here, and only the target's status is reported.
    pub fn run(mut self, target: &Prepared) -> Result<Outcome, Error> {
        let traps = self
            .policy
            .iter()
            .filter_map(|(signo, action)| match action {
                Action::Trap(command) => Some((*signo, command)),
                Action::Ignore => None,
            })
            .map(|(signo, command)| Ok((signo, trap::prepare(command, signo, target.env())?)))
            .collect::<Result<BTreeMap<_, _>, Error>>()?;

        self.ignored = signal::ignored();
        let mut signals = Signals::new(iter::empty::<c_int>()).map_err(Error::Signals)?;
        for signo in signal::catchable() {
            if let Err(e) = signals.add_signal(signo) {
                debug!("Cannot catch {}: {e}", signal::name(signo));
            }
        }

        loop {
            match self.state {
                State::Unforked => {
                    self.state = match fork::retrying("target") {
                        ForkResult::Child => fork::exec_child(target, &self.ignored),
                        ForkResult::Parent { child } => State::Forked(child),
                    }
                }
                State::Forked(child) => {
                    debug!("Supervising {child}");
                    self.state = State::Waiting(child);
                }
                State::Waiting(child) => {
                    // A signal may have been delivered before the handlers
                    // could see it, including the child's exit.
                    if let Some(outcome) = reap(child)? {
                        self.state = State::Terminated(outcome);
                        continue;
                    }
                    for signo in signals.forever() {
                        if signo == SIGCHLD {
                            if let Some(outcome) = reap(child)? {
                                self.state = State::Terminated(outcome);
                                break;
                            }
                        } else {
                            self.relay(child, signo, &traps);
                        }
                    }
                }
                State::Terminated(outcome) => {
                    report(outcome);
                    return Ok(outcome);
                }
            }
        }
    }

    /// Handle one non-child signal.
    fn relay(&self, child: Pid, signo: c_int, traps: &BTreeMap<c_int, Prepared>) {
        if let Some(trap) = traps.get(&signo) {
            debug!("Trapped {}", signal::name(signo));
            trap::spawn(trap, &self.ignored);
        } else if self.policy.get(&signo) == Some(&Action::Ignore) {
            debug!("Ignored {}", signal::name(signo));
        } else if let Err(errno) = signal::send(child, signo) {
            warn!("Failed to forward {}: {errno}", signal::name(signo));
        }
    }
}

/// Collect every exited child, returning the target's outcome if it was
/// among them. Anything else is a trap finishing.
fn reap(child: Pid) -> Result<Option<Outcome>, Error> {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => return Ok(None),
            Ok(WaitStatus::Exited(pid, code)) if pid == child => {
                return Ok(Some(Outcome::Exited(code)));
            }
            Ok(WaitStatus::Signaled(pid, sig, _)) if pid == child => {
                return Ok(Some(Outcome::Signaled(sig as c_int)));
            }
            Ok(status) if status.pid() == Some(child) => return Ok(Some(Outcome::Abnormal)),
            Ok(status) => debug!("Reaped {status:?}"),
            Err(Errno::EINTR) => continue,

            // The status could not be decoded, or there is nothing left to
            // wait for: either way the target is gone.
            Err(Errno::ECHILD) | Err(Errno::EINVAL) => return Ok(Some(Outcome::Abnormal)),
            Err(errno) => return Err(Error::Wait(errno)),
        }
    }
}

/// Log how the target ended.
fn report(outcome: Outcome) {
    match outcome {
        Outcome::Exited(code) => info!("Child exited with {code}"),
        Outcome::Signaled(signo) => warn!("Child terminated by {}", signal::name(signo)),
        Outcome::Abnormal => warn!("Child terminated abnormally"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(Outcome::Exited(0).code(), 0);
        assert_eq!(Outcome::Exited(3).code(), 3);
        assert_eq!(Outcome::Signaled(nix::libc::SIGTERM).code(), SIGNALED);
        assert_eq!(Outcome::Abnormal.code(), ABNORMAL);
    }
}
