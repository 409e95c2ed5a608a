//! `pgrphack`: run a command in a new session.

use super::Resolve;
use crate::{
    Error,
    launch::{Builder, LaunchSpec},
};
use std::ffi::OsString;

/// Run a command in a new session.
#[derive(clap::Parser, Debug)]
#[command(name = "pgrphack", version, about = "Run a command in a new session")]
pub struct Args {
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
            .new_session(true)
            .command(self.command)
            .build()
    }
}
