//! `envdir`: run a command with variables loaded from a directory.

use super::Resolve;
use crate::{
    Error,
    launch::{Builder, LaunchSpec},
};
use std::{ffi::OsString, path::PathBuf};

/// Run a command with an environment directory.
#[derive(clap::Parser, Debug)]
#[command(name = "envdir", version, about = "Run a command with an environment directory")]
pub struct Args {
    /// A directory of files named after the variables they set.
    pub dir: PathBuf,

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
            .env_dir(&self.dir)?
            .command(self.command)
            .build()
    }
}
