//! Command line personalities.
//!
//! The name the program is invoked as decides which flags are accepted.
//! Every personality resolves to the same `LaunchSpec`.

pub mod envdir;
pub mod envmod;
pub mod envuidgid;
pub mod pgrphack;
pub mod setlock;
pub mod setuidgid;
pub mod softlimit;

use crate::{Error, launch::LaunchSpec};
use clap::Parser;
use enum_dispatch::enum_dispatch;
use log::warn;
use spawn::signal;
use std::ffi::{OsString, c_int};
use user::Identity;

/// The grammar the binary was invoked with.
#[enum_dispatch(Resolve)]
#[derive(Debug)]
pub enum Personality {
    /// Every flag, also answering to `chpst`.
    Envmod(envmod::Args),

    /// Resource limits only.
    Softlimit(softlimit::Args),

    /// A lock file.
    Setlock(setlock::Args),

    /// Assume an identity.
    Setuidgid(setuidgid::Args),

    /// Export an identity.
    Envuidgid(envuidgid::Args),

    /// Load an environment directory.
    Envdir(envdir::Args),

    /// Start a new session.
    Pgrphack(pgrphack::Args),
}
impl Personality {
    /// Parse `args` with the grammar of the personality called `name`.
    /// Unknown names fall back to the full `envmod` grammar.
    pub fn parse<I, T>(name: &str, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(match name {
            "envmod" | "chpst" => Self::Envmod(envmod::Args::try_parse_from(args)?),
            "softlimit" => Self::Softlimit(softlimit::Args::try_parse_from(args)?),
            "setlock" => Self::Setlock(setlock::Args::try_parse_from(args)?),
            "setuidgid" => Self::Setuidgid(setuidgid::Args::try_parse_from(args)?),
            "envuidgid" => Self::Envuidgid(envuidgid::Args::try_parse_from(args)?),
            "envdir" => Self::Envdir(envdir::Args::try_parse_from(args)?),
            "pgrphack" => Self::Pgrphack(pgrphack::Args::try_parse_from(args)?),
            _ => {
                warn!("Unknown program name '{name}', assuming envmod");
                Self::Envmod(envmod::Args::try_parse_from(args)?)
            }
        })
    }
}

#[enum_dispatch]
pub trait Resolve {
    /// Resolve the arguments into a plan. Nothing is changed yet.
    fn resolve(self) -> Result<LaunchSpec, Error>;

    /// How many times `-v` was given.
    fn verbosity(&self) -> u8 {
        0
    }
}

/// Resolve an identity argument.
pub(crate) fn identity(spec: &str) -> Result<Identity, Error> {
    Identity::parse(spec).map_err(|source| Error::Identity {
        spec: spec.to_owned(),
        source,
    })
}

/// Resolve a `--trap` or `--ignore` signal. Only signals the supervisor
/// can act on are accepted.
pub(crate) fn signo(name: &str) -> Result<c_int, Error> {
    let signo =
        signal::lookup(name).ok_or_else(|| Error::Usage(format!("unknown signal '{name}'")))?;
    if signal::relayable(signo) {
        Ok(signo)
    } else {
        Err(Error::Usage(format!(
            "{} cannot be trapped or ignored",
            signal::name(signo)
        )))
    }
}
