//! `setlock`: run a command holding an exclusive lock.

use super::Resolve;
use crate::{
    Error,
    launch::{Builder, LaunchSpec, LockRequest},
};
use std::{ffi::OsString, path::PathBuf};

/// Run a command holding an exclusive lock.
#[derive(clap::Parser, Debug)]
#[command(name = "setlock", version, about = "Run a command holding an exclusive lock")]
pub struct Args {
    /// Fail if the lock is held.
    #[arg(short = 'n', overrides_with = "wait")]
    pub no_wait: bool,

    /// Wait for the lock (default).
    #[arg(short = 'N', overrides_with = "no_wait")]
    pub wait: bool,

    /// Exit 0 without running the command if the lock is held.
    #[arg(short = 'x', overrides_with = "loud")]
    pub quiet: bool,

    /// Report a held lock as an error (default).
    #[arg(short = 'X', overrides_with = "quiet")]
    pub loud: bool,

    /// The lock file, created if missing.
    pub file: PathBuf,

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
        let mut request = LockRequest::new(self.file, !self.no_wait);
        request.quiet_busy = self.quiet;
        Builder::new().lock(request).command(self.command).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use clap::Parser;

    fn lock(args: &[&str]) -> Result<LockRequest> {
        let spec = Args::try_parse_from(args)?.resolve()?;
        spec.lock()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no lock"))
    }

    #[test]
    fn defaults() -> Result<()> {
        let request = lock(&["setlock", "/tmp/l", "true"])?;
        assert!(request.blocking);
        assert!(!request.quiet_busy);
        Ok(())
    }

    #[test]
    fn last_flag_wins() -> Result<()> {
        let request = lock(&["setlock", "-N", "-n", "-x", "/tmp/l", "true"])?;
        assert!(!request.blocking);
        assert!(request.quiet_busy);

        let request = lock(&["setlock", "-n", "-N", "-x", "-X", "/tmp/l", "true"])?;
        assert!(request.blocking);
        assert!(!request.quiet_busy);
        Ok(())
    }

    #[test]
    fn file_and_command_required() {
        assert!(Args::try_parse_from(["setlock", "/tmp/l"]).is_err());
    }
}
