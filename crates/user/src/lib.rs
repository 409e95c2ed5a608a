#![doc = include_str!("../README.md")]

mod parse;

pub use parse::{Error as ParseError, MAX_GROUPS};

use log::debug;
use nix::{
    errno::Errno,
    unistd::{Gid, Uid, getgid, getuid, setgid, setuid},
};
use std::{
    error, fmt,
    path::{Path, PathBuf},
};

/// A resolved user id and its ordered group list.
///
/// The first group is the primary group; the list is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The user to become.
    uid: Uid,

    /// Primary group first, then supplementary groups in the order given.
    gids: Vec<Gid>,

    /// The login shell from the password database, when resolved by name.
    shell: Option<PathBuf>,
}
impl Identity {
    /// Construct an identity with a single group.
    pub fn new(uid: Uid, primary: Gid) -> Self {
        Self {
            uid,
            gids: vec![primary],
            shell: None,
        }
    }

    /// Construct an identity from an ordered group list.
    /// Returns None if `gids` is empty, as there would be no primary group.
    pub fn with_groups(uid: Uid, gids: Vec<Gid>) -> Option<Self> {
        if gids.is_empty() {
            None
        } else {
            Some(Self {
                uid,
                gids,
                shell: None,
            })
        }
    }

    /// Resolve a `user[:group...]` or `:uid[:gid...]` specification.
    ///
    /// ## Examples
    /// ```rust
    /// let identity = user::Identity::parse(":0").unwrap();
    /// assert!(identity.uid().is_root());
    /// assert_eq!(identity.gids().len(), 1);
    /// ```
    pub fn parse(spec: &str) -> Result<Self, ParseError> {
        parse::parse(spec)
    }

    /// The user id.
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// The primary group id.
    pub fn primary(&self) -> Gid {
        self.gids[0]
    }

    /// Every group, primary first.
    pub fn gids(&self) -> &[Gid] {
        &self.gids
    }

    /// The login shell recorded for the user, if the identity was resolved by name.
    pub fn shell(&self) -> Option<&Path> {
        self.shell.as_deref()
    }

    /// Assume this identity for the rest of the process' life.
    ///
    /// Supplementary groups are set first, then the primary group, then the
    /// user. Each step is fatal: if any fails the process is left wherever
    /// the failing step found it, and the caller is expected to exit.
    pub fn assume(&self) -> Result<(), Error> {
        let fail = |step| {
            let uid = self.uid;
            let gid = self.primary();
            move |errno| Error {
                uid,
                gid,
                step,
                errno,
            }
        };

        #[cfg(not(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "redox",
            target_os = "haiku"
        )))]
        nix::unistd::setgroups(&self.gids).map_err(fail(Step::Groups))?;

        setgid(self.primary()).map_err(fail(Step::Group))?;
        setuid(self.uid).map_err(fail(Step::User))?;

        debug!(
            "Assumed uid {} with groups {:?}",
            self.uid,
            self.gids.iter().map(|gid| gid.as_raw()).collect::<Vec<_>>()
        );
        Ok(())
    }
}

/// The privilege call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// setgroups
    Groups,

    /// setgid
    Group,

    /// setuid
    User,
}
impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Groups => write!(f, "setgroups"),
            Self::Group => write!(f, "setgid"),
            Self::User => write!(f, "setuid"),
        }
    }
}

/// An error when trying to assume an Identity.
#[derive(Debug)]
pub struct Error {
    /// The user we were trying to become.
    uid: Uid,

    /// The primary group we were trying to become.
    gid: Gid,

    /// The call that failed.
    step: Step,

    /// The error we got from the syscall.
    errno: Errno,
}
impl Error {
    /// The call that failed.
    pub fn step(&self) -> Step {
        self.step
    }

    /// The underlying error.
    pub fn errno(&self) -> Errno {
        self.errno
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: failed to change from ({}, {}) to ({}, {}): {}",
            self.step,
            getuid(),
            getgid(),
            self.uid,
            self.gid,
            self.errno
        )
    }
}
impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.errno as &dyn error::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn empty_groups() {
        assert!(Identity::with_groups(Uid::from_raw(1), Vec::new()).is_none());
    }

    #[test]
    fn primary_first() {
        let identity =
            Identity::with_groups(Uid::from_raw(5), vec![Gid::from_raw(9), Gid::from_raw(2)])
                .unwrap();
        assert_eq!(identity.primary(), Gid::from_raw(9));
        assert_eq!(identity.gids(), &[Gid::from_raw(9), Gid::from_raw(2)]);
    }

    #[test]
    fn assume_unprivileged() -> Result<()> {
        // Only meaningful when we cannot change identity.
        if getuid().is_root() {
            return Ok(());
        }

        let target = Identity::new(Uid::from_raw(0), Gid::from_raw(0));
        let error = target.assume().expect_err("unprivileged process became root");
        assert_eq!(error.errno(), Errno::EPERM);
        assert!(error.to_string().contains(&error.step().to_string()));
        Ok(())
    }
}
