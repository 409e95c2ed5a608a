//! The environment handed to the target, held as a value.
//!
//! The launcher snapshots its own environment once, the setup pipeline
//! edits the snapshot, and the exec step passes the result as `envp`.
//! The process' own `environ` is never modified.

pub mod dir;
pub mod file;

use log::warn;
use std::{
    collections::BTreeMap,
    env,
    ffi::{OsStr, OsString},
    io,
    os::unix::ffi::OsStrExt,
    path::PathBuf,
};
use thiserror::Error;

/// Errors loading environment edits.
#[derive(Debug, Error)]
pub enum Error {
    /// The directory or file could not be read at all.
    #[error("unable to read {}: {source}", path.display())]
    Open {
        /// What could not be read.
        path: PathBuf,

        /// Why.
        source: io::Error,
    },

    /// A directory entry's value contains `=`.
    #[error("invalid value in {}: '=' is not allowed", path.display())]
    Separator {
        /// The offending entry.
        path: PathBuf,
    },

    /// An environment file line contains a NUL byte, which no variable can hold.
    #[error("invalid line {line} in {}: NUL is not allowed", path.display())]
    Nul {
        /// The file.
        path: PathBuf,

        /// The line, counting from 1.
        line: usize,
    },
}
impl Error {
    /// Whether the error lies in what was configured, rather than in reading it.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Separator { .. } | Self::Nul { .. })
    }
}

/// A single change to the environment. Edits are absolute, so applying
/// the same list twice gives the same result as applying it once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvEdit {
    /// Set a key, replacing any previous value.
    Set(OsString, OsString),

    /// Remove a key if present.
    Unset(OsString),
}
impl EnvEdit {
    /// The key this edit affects.
    pub fn key(&self) -> &OsStr {
        match self {
            Self::Set(key, _) | Self::Unset(key) => key,
        }
    }

    /// Parse a `KEY=VALUE` command line token. An empty value still sets
    /// the key; only the environment file format treats it as a removal.
    pub fn parse_assignment(token: &OsStr) -> Option<Self> {
        let token = token.as_bytes();
        let split = token.iter().position(|b| *b == b'=')?;
        if split == 0 {
            return None;
        }
        Some(Self::Set(
            OsStr::from_bytes(&token[..split]).to_owned(),
            OsStr::from_bytes(&token[split + 1..]).to_owned(),
        ))
    }
}

/// A complete environment, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Key to value.
    vars: BTreeMap<OsString, OsString>,
}
impl Environment {
    /// Snapshot the environment of the running process.
    pub fn current() -> Self {
        env::vars_os().collect()
    }

    /// The value of `key`.
    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    /// Set `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        let _ = self.vars.insert(key.into(), value.into());
    }

    /// Remove `key` if present.
    pub fn unset(&mut self, key: impl AsRef<OsStr>) {
        let _ = self.vars.remove(key.as_ref());
    }

    /// Apply edits left to right.
    pub fn apply<'a>(&mut self, edits: impl IntoIterator<Item = &'a EnvEdit>) {
        for edit in edits {
            match edit {
                EnvEdit::Set(key, value) => self.set(key, value),
                EnvEdit::Unset(key) => self.unset(key),
            }
        }
    }

    /// Discard everything except `keep`. Keys that were not set are skipped.
    pub fn clear_keeping(&mut self, keep: &[OsString]) {
        let mut previous = std::mem::take(&mut self.vars);
        for key in keep {
            match previous.remove(key) {
                Some(value) => self.set(key, value),
                None => warn!("Cannot keep {}: not set", key.to_string_lossy()),
            }
        }
    }

    /// Whether nothing is set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Every pair, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars
            .iter()
            .map(|(key, value)| (key.as_os_str(), value.as_os_str()))
    }
}
impl<K: Into<OsString>, V: Into<OsString>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}
