//! The exec step: resolve the final argument vector and replace the process
//! image with it, using an explicit environment.

use log::trace;
use nix::{errno::Errno, unistd::execve};
use std::{
    borrow::Cow,
    ffi::{CString, NulError, OsStr, OsString},
    io,
    os::unix::ffi::{OsStrExt, OsStringExt},
    path::PathBuf,
};
use thiserror::Error;
use which::which_in;

/// Errors related to executing or supervising the target.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors when passed arguments contain Null values.
    #[error("Provided string contains null values: {0}")]
    Null(#[from] NulError),

    /// Errors resolving binary paths.
    #[error("{0}")]
    Path(#[from] which::Error),

    /// The exec itself failed.
    #[error("could not execute {0}: {1}")]
    Exec(String, Errno),

    /// Handlers for the supervisor could not be installed.
    #[error("Failed to install signal handlers: {0}")]
    Signals(io::Error),

    /// Waiting on the supervised child failed.
    #[error("Failed to wait for child: {0}")]
    Wait(Errno),
}

/// Build the exec of a target program.
///
/// Program names and arguments are kept as raw bytes; nothing here needs
/// them to be UTF-8.
///
/// ## Examples
/// Run `echo` as `greeter`, with an empty environment:
/// ```rust,no_run
/// let error = spawn::Exec::new("/bin/echo")
///     .argv0("greeter")
///     .args(["hello"])
///     .exec();
/// eprintln!("{error}");
/// ```
#[derive(Debug, Default)]
pub struct Exec {
    /// The binary to run, resolved from the environment's **PATH**.
    cmd: OsString,

    /// Arguments, not including the program name.
    args: Vec<OsString>,

    /// The name the program sees as `argv[0]`. Lookup still uses `cmd`.
    argv0: Option<OsString>,

    /// Wrap the command as `shell -c "command"`.
    shell: Option<PathBuf>,

    /// The complete environment of the new image.
    env: Vec<(OsString, OsString)>,
}
impl Exec {
    /// Construct an `Exec` of *cmd*.
    pub fn new(cmd: impl Into<OsString>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Default::default()
        }
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Replace the program name the target sees.
    pub fn argv0(mut self, argv0: impl Into<OsString>) -> Self {
        self.argv0 = Some(argv0.into());
        self
    }

    /// Run the command through `shell -c`.
    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    /// Append environment variables. The target receives exactly these.
    pub fn env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// The command line as a single shell word list.
    fn command_line(&self) -> OsString {
        let mut line = Vec::new();
        for (i, word) in std::iter::once(&self.cmd).chain(&self.args).enumerate() {
            if i > 0 {
                line.push(b' ');
            }
            line.extend_from_slice(&quote(word.as_bytes()));
        }
        OsString::from_vec(line)
    }

    /// Resolve the program and convert everything into the form `execve`
    /// wants. Nothing is allocated after this, so the result can be used
    /// directly in a forked child.
    pub fn prepare(self) -> Result<Prepared, Error> {
        let path = self
            .env
            .iter()
            .find(|(key, _)| key == "PATH")
            .map(|(_, value)| value.as_os_str());

        let (program, argv) = match &self.shell {
            Some(shell) => {
                let shell = shell.as_os_str().to_owned();
                let argv0 = self.argv0.clone().unwrap_or_else(|| shell.clone());
                (shell, vec![argv0, "-c".into(), self.command_line()])
            }
            None => {
                let argv0 = self.argv0.clone().unwrap_or_else(|| self.cmd.clone());
                let mut argv = vec![argv0];
                argv.extend(self.args.iter().cloned());
                (self.cmd.clone(), argv)
            }
        };

        let resolved = which_in(&program, path)?;
        let path = CString::new(resolved.as_os_str().as_bytes())?;
        let argv = argv
            .into_iter()
            .map(|arg| CString::new(arg.into_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        let envp = self
            .env
            .iter()
            .map(|(key, value)| {
                let mut pair = key.as_bytes().to_vec();
                pair.push(b'=');
                pair.extend_from_slice(value.as_bytes());
                CString::new(pair)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if log::max_level() == log::Level::Trace {
            let formatted = argv
                .iter()
                .map(|s| s.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");
            trace!("{} -> {formatted:?}", resolved.display());
        }

        Ok(Prepared { path, argv, envp })
    }

    /// Prepare and exec. Only returns if something failed.
    pub fn exec(self) -> Error {
        match self.prepare() {
            Ok(prepared) => prepared.exec(),
            Err(e) => e,
        }
    }
}

/// Quote a word for `sh -c` if it contains anything the shell would interpret.
fn quote(word: &[u8]) -> Cow<'_, [u8]> {
    let plain = !word.is_empty()
        && word
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./=:,+@%".contains(b));
    if plain {
        return Cow::Borrowed(word);
    }

    let mut quoted = vec![b'\''];
    for b in word {
        if *b == b'\'' {
            quoted.extend_from_slice(br"'\''");
        } else {
            quoted.push(*b);
        }
    }
    quoted.push(b'\'');
    Cow::Owned(quoted)
}

/// A resolved, ready-to-run exec.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// The resolved executable.
    path: CString,

    /// The argument vector, `argv[0]` included.
    argv: Vec<CString>,

    /// `KEY=VALUE` pairs.
    envp: Vec<CString>,
}
impl Prepared {
    /// The resolved executable.
    pub fn path(&self) -> &OsStr {
        OsStr::from_bytes(self.path.as_bytes())
    }

    /// The argument vector, `argv[0]` included.
    pub fn argv(&self) -> &[CString] {
        &self.argv
    }

    /// The environment handed to the target.
    pub fn env(&self) -> &[CString] {
        &self.envp
    }

    /// Replace the current process image. Only returns on failure.
    pub fn exec(&self) -> Error {
        match execve(&self.path, &self.argv, &self.envp) {
            Ok(never) => match never {},
            Err(errno) => Error::Exec(self.path.to_string_lossy().into_owned(), errno),
        }
    }
}
