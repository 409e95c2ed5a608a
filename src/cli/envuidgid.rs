//! `envuidgid`: export a user's ids as UID and GID, without becoming it.

use super::{Resolve, identity};
use crate::{
    Error,
    launch::{Builder, LaunchSpec},
};
use std::ffi::OsString;

/// Run a command with UID and GID set.
#[derive(clap::Parser, Debug)]
#[command(name = "envuidgid", version, about = "Run a command with UID and GID set")]
pub struct Args {
    /// USER[:GROUP...] or :UID[:GID...].
    pub identity: String,

    /// The command to run.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required = true,
        value_parser = clap::value_parser!(OsString)
    )]
    pub command: Vec<OsString>,
}
impl Resolve for Args {
    fn resolve(self) -> Result<LaunchSpec, Error> {
        Builder::new()
            .env_identity(identity(&self.identity)?)
            .command(self.command)
            .build()
    }
}
