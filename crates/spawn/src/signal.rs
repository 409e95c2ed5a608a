//! Signal name and number lookup.
//!
//! Names are accepted with or without the `SIG` prefix and in any case.
//! Real-time signals are written `RTMIN+n` or `RTMAX-n`.

use nix::{errno::Errno, libc, sys::signal::Signal, unistd::Pid};
use std::{ffi::c_int, mem::MaybeUninit, ptr, str::FromStr};

/// The highest signal number on this platform.
pub fn max() -> c_int {
    #[cfg(target_os = "linux")]
    {
        libc::SIGRTMAX()
    }

    #[cfg(not(target_os = "linux"))]
    {
        31
    }
}

/// The lowest real-time signal, if the platform has them.
fn rtmin() -> Option<c_int> {
    #[cfg(target_os = "linux")]
    {
        Some(libc::SIGRTMIN())
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Every signal a handler can be installed for.
pub fn catchable() -> impl Iterator<Item = c_int> {
    (1..=max()).filter(|signo| !signal_hook::consts::FORBIDDEN.contains(signo))
}

/// Resolve a signal by name or number.
///
/// ## Examples
/// ```rust
/// assert_eq!(spawn::signal::lookup("term"), Some(15));
/// assert_eq!(spawn::signal::lookup("SIGUSR1"), spawn::signal::lookup("10"));
/// ```
pub fn lookup(name: &str) -> Option<c_int> {
    let name = name.trim();
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
        return name
            .parse()
            .ok()
            .filter(|signo| (1..=max()).contains(signo));
    }

    let upper = name.to_ascii_uppercase();
    let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
    if let Some(signo) = realtime(bare) {
        return Some(signo);
    }

    Signal::from_str(&format!("SIG{bare}"))
        .ok()
        .map(|signal| signal as c_int)
}

/// Resolve `RTMIN+n` or `RTMAX-n`, without the `SIG` prefix.
fn realtime(bare: &str) -> Option<c_int> {
    let min = rtmin()?;
    let max = max();
    let (base, rest) = if let Some(rest) = bare.strip_prefix("RTMIN") {
        (min, rest)
    } else if let Some(rest) = bare.strip_prefix("RTMAX") {
        (max, rest)
    } else {
        return None;
    };

    let signo = match rest.as_bytes().first() {
        None => base,
        Some(b'+') => base.checked_add(rest[1..].parse().ok()?)?,
        Some(b'-') => base.checked_sub(rest[1..].parse().ok()?)?,
        Some(_) => return None,
    };
    (min..=max).contains(&signo).then_some(signo)
}

/// The canonical name of a signal number, e.g. `SIGTERM` or `SIGRTMIN+2`.
pub fn name(signo: c_int) -> String {
    if let Ok(signal) = Signal::try_from(signo) {
        return signal.as_str().to_owned();
    }
    match rtmin() {
        Some(min) if signo == min => "SIGRTMIN".to_owned(),
        Some(min) if signo > min && signo <= max() => format!("SIGRTMIN+{}", signo - min),
        _ => format!("SIG{signo}"),
    }
}

/// Whether a handler-side policy can apply to `signo`. `SIGKILL` and
/// `SIGSTOP` are never delivered to a handler, and `SIGCHLD` is how the
/// supervisor learns the target has exited.
pub fn relayable(signo: c_int) -> bool {
    catchable().any(|catchable| catchable == signo) && signo != libc::SIGCHLD
}

/// The catchable signals currently set to `SIG_IGN`, which an exec'd image
/// would inherit as ignored.
pub fn ignored() -> Vec<c_int> {
    catchable()
        .filter(|signo| {
            let mut current = MaybeUninit::<libc::sigaction>::zeroed();
            // SAFETY: A null action only reads the current disposition.
            let queried = unsafe { libc::sigaction(*signo, ptr::null(), current.as_mut_ptr()) };
            // SAFETY: Zeroed is a valid sigaction, and a successful call filled it.
            queried == 0 && unsafe { current.assume_init() }.sa_sigaction == libc::SIG_IGN
        })
        .collect()
}

/// Send a signal by number, including real-time signals.
pub fn send(pid: Pid, signo: c_int) -> Result<(), Errno> {
    // SAFETY: kill has no memory safety requirements.
    Errno::result(unsafe { libc::kill(pid.as_raw(), signo) }).map(drop)
}
