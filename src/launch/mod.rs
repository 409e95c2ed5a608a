//! The launch plan: everything the setup pipeline and the exec step need,
//! resolved before anything touches the process.

pub mod limit;

pub use limit::{Limit, ResourceKind};

use crate::{
    Error,
    environ::{self, EnvEdit},
};
use spawn::{Action, Policy};
use std::{
    collections::{BTreeMap, BTreeSet},
    ffi::{OsString, c_int},
    mem,
    os::fd::RawFd,
    path::{Path, PathBuf},
    time::Duration,
};
use user::Identity;

/// Descriptors above this cannot be closed from the command line.
pub const MAX_CLOSE_FD: RawFd = 9;

/// How a lock is shared with other holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exclusivity {
    /// Any number of shared holders at once.
    Shared,

    /// A single holder.
    #[default]
    Exclusive,
}

/// An advisory lock to hold across exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRequest {
    /// The lock file, created if missing.
    pub path: PathBuf,

    /// Shared or exclusive.
    pub exclusivity: Exclusivity,

    /// Wait for the lock, rather than failing if it is held.
    pub blocking: bool,

    /// Give up waiting after this long.
    pub timeout: Option<Duration>,

    /// A held lock is not an error: exit successfully without running anything.
    pub quiet_busy: bool,
}
impl LockRequest {
    /// An exclusive lock on `path`.
    pub fn new(path: impl Into<PathBuf>, blocking: bool) -> Self {
        Self {
            path: path.into(),
            exclusivity: Exclusivity::Exclusive,
            blocking,
            timeout: None,
            quiet_busy: false,
        }
    }
}

/// The resolved plan. Built once by a `Builder`, then only read.
#[derive(Debug, Clone, Default)]
pub struct LaunchSpec {
    /// The identity to assume.
    pub(crate) identity: Option<Identity>,

    /// The identity to export as `UID` and `GID`, if not `identity`.
    pub(crate) env_identity: Option<Identity>,

    /// The new root directory.
    pub(crate) chroot: Option<PathBuf>,

    /// The working directory, relative to the new root.
    pub(crate) work_dir: Option<PathBuf>,

    /// Niceness adjustment; 0 leaves it alone.
    pub(crate) nice: i32,

    /// Soft limits to set. Never holds `Limit::Unchanged`.
    pub(crate) limits: BTreeMap<ResourceKind, Limit>,

    /// The lock to hold across exec.
    pub(crate) lock: Option<LockRequest>,

    /// Descriptors to close before exec.
    pub(crate) close: BTreeSet<RawFd>,

    /// Environment edits: directories, then files, then explicit assignments.
    pub(crate) edits: Vec<EnvEdit>,

    /// Start from an empty environment.
    pub(crate) clear_environment: bool,

    /// Keys carried over a cleared environment.
    pub(crate) keep: Vec<OsString>,

    /// Keys removed from an environment that is not cleared.
    pub(crate) remove: Vec<OsString>,

    /// Start a new session first.
    pub(crate) new_session: bool,

    /// Run the command through a login shell.
    pub(crate) login_shell: bool,

    /// The name the target sees as `argv[0]`.
    pub(crate) argv0: Option<OsString>,

    /// Signals that are trapped or dropped. Non-empty means supervised.
    pub(crate) signals: Policy,

    /// The program and its arguments.
    pub(crate) command: Vec<OsString>,
}
impl LaunchSpec {
    /// The program and its arguments.
    pub fn command(&self) -> &[OsString] {
        &self.command
    }

    /// Whether the target runs under the supervisor rather than replacing us.
    pub fn supervised(&self) -> bool {
        !self.signals.is_empty()
    }

    /// The identity the process assumes.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The lock held across exec.
    pub fn lock(&self) -> Option<&LockRequest> {
        self.lock.as_ref()
    }

    /// Environment edits, in the order they are applied.
    pub fn edits(&self) -> &[EnvEdit] {
        &self.edits
    }
}

/// Accumulate options into a `LaunchSpec`.
///
/// Environment sources are kept apart while building so that, whatever
/// order they were given in, directory edits apply first, then file edits,
/// then explicit assignments.
#[derive(Debug, Default)]
pub struct Builder {
    /// Everything but the environment edits.
    spec: LaunchSpec,

    /// Edits from `-e`.
    dir_edits: Vec<EnvEdit>,

    /// Edits from `-E`.
    file_edits: Vec<EnvEdit>,

    /// `KEY=VALUE` words before the command.
    explicit_edits: Vec<EnvEdit>,
}
impl Builder {
    /// An empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assume `identity` before anything touches the filesystem.
    pub fn identity(&mut self, identity: Identity) -> &mut Self {
        self.spec.identity = Some(identity);
        self
    }

    /// The identity exported as `UID` and `GID`.
    pub fn env_identity(&mut self, identity: Identity) -> &mut Self {
        self.spec.env_identity = Some(identity);
        self
    }

    /// Change root to `path`.
    pub fn chroot(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.spec.chroot = Some(path.into());
        self
    }

    /// Change directory to `path`, after any change of root.
    pub fn work_dir(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.spec.work_dir = Some(path.into());
        self
    }

    /// Adjust niceness by `delta`; 0 leaves it alone.
    pub fn nice(&mut self, delta: i32) -> &mut Self {
        self.spec.nice = delta;
        self
    }

    /// Request a soft limit. `Limit::Unchanged` drops an earlier request.
    pub fn limit(&mut self, kind: ResourceKind, limit: Limit) -> &mut Self {
        if limit == Limit::Unchanged {
            let _ = self.spec.limits.remove(&kind);
        } else {
            let _ = self.spec.limits.insert(kind, limit);
        }
        self
    }

    /// Hold a lock across exec.
    pub fn lock(&mut self, request: LockRequest) -> &mut Self {
        self.spec.lock = Some(request);
        self
    }

    /// Close `fd` before exec.
    pub fn close(&mut self, fd: RawFd) -> Result<&mut Self, Error> {
        if !(0..=MAX_CLOSE_FD).contains(&fd) {
            return Err(Error::Usage(format!(
                "cannot close descriptor {fd}: only 0 to {MAX_CLOSE_FD} are allowed"
            )));
        }
        let _ = self.spec.close.insert(fd);
        Ok(self)
    }

    /// Load an environment directory.
    pub fn env_dir(&mut self, dir: &Path) -> Result<&mut Self, Error> {
        self.dir_edits.extend(environ::dir::load(dir)?);
        Ok(self)
    }

    /// Load an environment file.
    pub fn env_file(&mut self, file: &Path) -> Result<&mut Self, Error> {
        self.file_edits.extend(environ::file::load(file)?);
        Ok(self)
    }

    /// Set a variable explicitly.
    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> &mut Self {
        self.explicit_edits
            .push(EnvEdit::Set(key.into(), value.into()));
        self
    }

    /// Start from an empty environment.
    pub fn clear_environment(&mut self, clear: bool) -> &mut Self {
        self.spec.clear_environment = clear;
        self
    }

    /// Carry `key` over when the environment is cleared.
    pub fn keep(&mut self, key: impl Into<OsString>) -> &mut Self {
        self.spec.keep.push(key.into());
        self
    }

    /// Remove `key` when the environment is not cleared.
    pub fn remove(&mut self, key: impl Into<OsString>) -> &mut Self {
        self.spec.remove.push(key.into());
        self
    }

    /// Start a new session.
    pub fn new_session(&mut self, new_session: bool) -> &mut Self {
        self.spec.new_session = new_session;
        self
    }

    /// Wrap the command in a login shell.
    pub fn login_shell(&mut self, login_shell: bool) -> &mut Self {
        self.spec.login_shell = login_shell;
        self
    }

    /// Give the target another `argv[0]`.
    pub fn argv0(&mut self, argv0: impl Into<OsString>) -> &mut Self {
        self.spec.argv0 = Some(argv0.into());
        self
    }

    /// Run `command` in a shell whenever `signo` arrives.
    pub fn trap(&mut self, signo: c_int, command: impl Into<String>) -> &mut Self {
        let _ = self.spec.signals.insert(signo, Action::Trap(command.into()));
        self
    }

    /// Drop `signo` instead of forwarding it.
    pub fn ignore(&mut self, signo: c_int) -> &mut Self {
        let _ = self.spec.signals.insert(signo, Action::Ignore);
        self
    }

    /// Set the command. Leading `KEY=VALUE` words become explicit
    /// assignments; the first word without `=` is the program.
    pub fn command<I, S>(&mut self, words: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut words = words.into_iter().map(Into::into).peekable();
        while let Some(edit) = words.peek().and_then(|word| EnvEdit::parse_assignment(word)) {
            self.explicit_edits.push(edit);
            let _ = words.next();
        }
        self.spec.command = words.collect();
        self
    }

    /// Finish the plan.
    pub fn build(&mut self) -> Result<LaunchSpec, Error> {
        if self.spec.command.is_empty() {
            return Err(Error::Usage("command required".to_owned()));
        }

        let mut spec = mem::take(&mut self.spec);
        spec.edits = mem::take(&mut self.dir_edits)
            .into_iter()
            .chain(mem::take(&mut self.file_edits))
            .chain(mem::take(&mut self.explicit_edits))
            .collect();
        Ok(spec)
    }
}
