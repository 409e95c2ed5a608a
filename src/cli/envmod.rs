//! `envmod`: the full flag set.

use super::{Resolve, identity, signo, softlimit::Limits};
use crate::{
    Error,
    launch::{Builder, Exclusivity, LaunchSpec, LockRequest},
};
use clap::ArgAction;
use std::{ffi::OsString, path::PathBuf, time::Duration};

/// Run a command with a modified process state.
#[derive(clap::Parser, Debug, Default)]
#[command(name = "envmod", version, about = "Run a command with a modified process state")]
pub struct Args {
    /// Run as USER[:GROUP...] or :UID[:GID...].
    #[arg(short = 'u', value_name = "ID")]
    pub user: Option<String>,

    /// Export the user and primary group of ID as UID and GID.
    #[arg(short = 'U', value_name = "ID")]
    pub env_user: Option<String>,

    /// Run the command with this as its name.
    #[arg(short = 'b', value_name = "ARGV0", value_parser = clap::value_parser!(OsString))]
    pub argv0: Option<OsString>,

    /// Change the root directory.
    #[arg(short = '/', value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Change the working directory, after changing root.
    #[arg(short = 'C', value_name = "DIR")]
    pub chdir: Option<PathBuf>,

    /// Adjust niceness.
    #[arg(short = 'n', value_name = "DELTA", allow_negative_numbers = true)]
    pub nice: Option<i32>,

    /// Take an exclusive lock, failing if it is held.
    #[arg(short = 'l', value_name = "FILE", conflicts_with = "lock_wait")]
    pub lock: Option<PathBuf>,

    /// Take an exclusive lock, waiting for it.
    #[arg(short = 'L', value_name = "FILE")]
    pub lock_wait: Option<PathBuf>,

    /// Take the lock shared.
    #[arg(long)]
    pub lock_shared: bool,

    /// Give up waiting for the lock after SECS seconds.
    #[arg(long, value_name = "SECS", requires = "lock_wait")]
    pub lock_timeout: Option<u64>,

    /// Load an environment directory.
    #[arg(short = 'e', value_name = "DIR")]
    pub env_dir: Vec<PathBuf>,

    /// Load an environment file.
    #[arg(short = 'E', value_name = "FILE")]
    pub env_file: Vec<PathBuf>,

    /// Start from an empty environment.
    #[arg(short = 'x')]
    pub clear: bool,

    /// Keep KEY when clearing the environment.
    #[arg(short = 'k', long = "keep", value_name = "KEY", requires = "clear")]
    pub keep: Vec<String>,

    /// Remove KEY from the environment.
    #[arg(long = "unset", value_name = "KEY", conflicts_with = "clear")]
    pub unset: Vec<String>,

    /// Log more. Repeat for more detail.
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Start a new session.
    #[arg(short = 'P')]
    pub new_session: bool,

    /// Run the command through the user's shell.
    #[arg(short = 'w', long)]
    pub login_shell: bool,

    /// Run COMMAND in a shell when SIG arrives, instead of forwarding it.
    #[arg(long, value_name = "SIG=COMMAND")]
    pub trap: Vec<String>,

    /// Drop SIG instead of forwarding it.
    #[arg(long, value_name = "SIG")]
    pub ignore: Vec<String>,

    /// Close standard input.
    #[arg(short = '0')]
    pub close0: bool,

    /// Close standard output.
    #[arg(short = '1')]
    pub close1: bool,

    /// Close standard error.
    #[arg(short = '2')]
    pub close2: bool,

    /// Close descriptor 3.
    #[arg(short = '3')]
    pub close3: bool,

    /// Close descriptor 4.
    #[arg(short = '4')]
    pub close4: bool,

    /// Close descriptor 5.
    #[arg(short = '5')]
    pub close5: bool,

    /// Close descriptor 6.
    #[arg(short = '6')]
    pub close6: bool,

    /// Close descriptor 7.
    #[arg(short = '7')]
    pub close7: bool,

    /// Close descriptor 8.
    #[arg(short = '8')]
    pub close8: bool,

    /// Close descriptor 9.
    #[arg(short = '9')]
    pub close9: bool,

    #[command(flatten)]
    pub limits: Limits,

    /// The command to run, optionally preceded by KEY=VALUE assignments.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required = true,
        value_parser = clap::value_parser!(OsString)
    )]
    pub command: Vec<OsString>,
}
impl Args {
    fn close(&self) -> impl Iterator<Item = i32> {
        [
            self.close0,
            self.close1,
            self.close2,
            self.close3,
            self.close4,
            self.close5,
            self.close6,
            self.close7,
            self.close8,
            self.close9,
        ]
        .into_iter()
        .zip(0..)
        .filter_map(|(close, fd)| close.then_some(fd))
    }

    fn lock_request(&self) -> Option<LockRequest> {
        let mut request = match (&self.lock, &self.lock_wait) {
            (Some(path), _) => LockRequest::new(path, false),
            (None, Some(path)) => LockRequest::new(path, true),
            (None, None) => return None,
        };
        if self.lock_shared {
            request.exclusivity = Exclusivity::Shared;
        }
        request.timeout = self.lock_timeout.map(Duration::from_secs);
        Some(request)
    }
}
impl Resolve for Args {
    fn resolve(self) -> Result<LaunchSpec, Error> {
        let mut builder = Builder::new();

        if let Some(user) = &self.user {
            let _ = builder.identity(identity(user)?);
        }
        if let Some(user) = &self.env_user {
            let _ = builder.env_identity(identity(user)?);
        }
        if let Some(argv0) = &self.argv0 {
            let _ = builder.argv0(argv0);
        }
        if let Some(root) = &self.root {
            let _ = builder.chroot(root);
        }
        if let Some(dir) = &self.chdir {
            let _ = builder.work_dir(dir);
        }
        if let Some(request) = self.lock_request() {
            let _ = builder.lock(request);
        }
        for fd in self.close() {
            let _ = builder.close(fd)?;
        }
        for dir in &self.env_dir {
            let _ = builder.env_dir(dir)?;
        }
        for file in &self.env_file {
            let _ = builder.env_file(file)?;
        }
        for key in &self.keep {
            let _ = builder.keep(key);
        }
        for key in &self.unset {
            let _ = builder.remove(key);
        }
        for trap in &self.trap {
            let (signal, command) = trap
                .split_once('=')
                .ok_or_else(|| Error::Usage(format!("expected SIG=COMMAND, got '{trap}'")))?;
            let _ = builder.trap(signo(signal)?, command);
        }
        for signal in &self.ignore {
            let _ = builder.ignore(signo(signal)?);
        }
        self.limits.configure(&mut builder);

        builder
            .nice(self.nice.unwrap_or_default())
            .clear_environment(self.clear)
            .new_session(self.new_session)
            .login_shell(self.login_shell)
            .command(self.command)
            .build()
    }

    fn verbosity(&self) -> u8 {
        self.verbose
    }
}
