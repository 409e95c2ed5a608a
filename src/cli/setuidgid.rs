//! `setuidgid`: run a command as another user.

use super::{Resolve, identity};
use crate::{
    Error,
    launch::{Builder, LaunchSpec},
};
use std::ffi::OsString;

/// Run a command as another user.
#[derive(clap::Parser, Debug)]
#[command(name = "setuidgid", version, about = "Run a command as another user")]
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
            .identity(identity(&self.identity)?)
            .command(self.command)
            .build()
    }
}
