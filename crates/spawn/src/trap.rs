//! Traps: shell commands run in a detached child when a signal arrives.
//!
//! Everything a trap needs is allocated up front by `prepare`, so that
//! `spawn` only has to fork and exec.

use crate::{Error, Exec, Prepared, fork, signal};
use log::debug;
use nix::unistd::ForkResult;
use std::{
    ffi::{CString, OsStr, OsString, c_int},
    os::unix::ffi::OsStrExt,
};

/// The shell trap commands are run with.
const SHELL: &str = "/bin/sh";

/// Split `KEY=VALUE` pairs back into their parts.
fn pairs(env: &[CString]) -> impl Iterator<Item = (OsString, OsString)> + '_ {
    env.iter().filter_map(|pair| {
        let bytes = pair.as_bytes();
        let split = bytes.iter().position(|b| *b == b'=')?;
        Some((
            OsStr::from_bytes(&bytes[..split]).to_owned(),
            OsStr::from_bytes(&bytes[split + 1..]).to_owned(),
        ))
    })
}

/// Prepare `sh -c command` with the target's environment, plus `signo`
/// and `signame` describing the signal that fired.
pub(crate) fn prepare(command: &str, signo: c_int, env: &[CString]) -> Result<Prepared, Error> {
    let inherited = pairs(env).filter(|(key, _)| key != "signo" && key != "signame");
    Exec::new(SHELL)
        .argv0("sh")
        .args(["-c", command])
        .env(inherited)
        .env([
            ("signo", signo.to_string()),
            ("signame", signal::name(signo)),
        ])
        .prepare()
}

/// Start a prepared trap without waiting for it. The supervisor reaps it
/// along with every other child.
pub(crate) fn spawn(trap: &Prepared, ignored: &[c_int]) {
    match fork::retrying("trap") {
        ForkResult::Child => fork::exec_child(trap, ignored),
        ForkResult::Parent { child } => debug!("Started trap as {child}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn environment() -> Result<()> {
        let env = [
            CString::new("PATH=/bin")?,
            CString::new("signo=stale")?,
            CString::new("EQ=a=b")?,
        ];
        let trap = prepare("echo $signame", nix::libc::SIGUSR1, &env)?;

        let argv: Vec<_> = trap.argv().iter().filter_map(|a| a.to_str().ok()).collect();
        assert_eq!(argv, ["sh", "-c", "echo $signame"]);
        assert_eq!(trap.path(), SHELL);

        let env: Vec<_> = trap.env().iter().filter_map(|e| e.to_str().ok()).collect();
        assert_eq!(
            env,
            [
                "PATH=/bin".to_owned(),
                "EQ=a=b".to_owned(),
                format!("signo={}", nix::libc::SIGUSR1),
                "signame=SIGUSR1".to_owned(),
            ]
        );
        Ok(())
    }
}
