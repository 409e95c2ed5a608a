//! Run a resolved plan: set the process up, then become or supervise the target.

use crate::{
    Error,
    environ::Environment,
    launch::LaunchSpec,
    setup::{self, Process},
    shared::env::SHELL,
};
use log::debug;
use spawn::{Exec, Prepared, Supervisor};
use std::path::{Path, PathBuf};
use user::Identity;

/// The shell for `-w`: the identity's login shell, then `SHELL`, then `/bin/sh`.
fn shell(spec: &LaunchSpec) -> PathBuf {
    spec.identity
        .as_ref()
        .and_then(Identity::shell)
        .map_or_else(|| SHELL.clone(), Path::to_path_buf)
}

/// Resolve the target against the final environment.
pub fn prepare(spec: &LaunchSpec, env: &Environment) -> Result<Prepared, Error> {
    let (program, args) = spec
        .command
        .split_first()
        .ok_or_else(|| Error::Usage("command required".to_owned()))?;

    let mut exec = Exec::new(program)
        .args(args.iter().cloned())
        .env(env.iter().map(|(key, value)| (key.to_owned(), value.to_owned())));
    if let Some(argv0) = &spec.argv0 {
        exec = exec.argv0(argv0);
    }
    if spec.login_shell {
        exec = exec.shell(shell(spec));
    }
    Ok(exec.prepare()?)
}

/// Apply `spec` to the process and run its command.
///
/// Without a signal policy the process is replaced, and this only returns
/// on failure. With one, the command runs as a supervised child and its
/// outcome is returned as an exit code.
pub fn run(spec: LaunchSpec, mut process: Process) -> Result<i32, Error> {
    setup::apply(&spec, &mut process)?;
    let target = prepare(&spec, process.env())?;

    if spec.supervised() {
        debug!("Supervising with {} signal actions", spec.signals.len());
        let outcome = Supervisor::new(spec.signals).run(&target)?;
        Ok(outcome.code())
    } else {
        Err(target.exec().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::Builder;
    use anyhow::Result;
    use nix::unistd::{Gid, Uid};
    use std::ffi::CString;

    fn strings(values: &[CString]) -> Vec<String> {
        values
            .iter()
            .map(|value| value.to_string_lossy().into_owned())
            .collect()
    }

    fn env() -> Environment {
        [("PATH", "/usr/bin:/bin"), ("SHELL", "/bin/false")]
            .into_iter()
            .collect()
    }

    #[test]
    fn argv0_keeps_lookup() -> Result<()> {
        let spec = Builder::new()
            .argv0("renamed")
            .command(vec!["sh".to_owned(), "-c".to_owned(), "true".to_owned()])
            .build()?;
        let target = prepare(&spec, &env())?;
        assert_eq!(strings(target.argv()), ["renamed", "-c", "true"]);
        assert!(target.path().to_string_lossy().ends_with("/sh"));
        Ok(())
    }

    #[test]
    fn environment_passed() -> Result<()> {
        let spec = Builder::new().command(vec!["true".to_owned()]).build()?;
        let target = prepare(&spec, &env())?;
        assert_eq!(
            strings(target.env()),
            ["PATH=/usr/bin:/bin", "SHELL=/bin/false"]
        );
        Ok(())
    }

    #[test]
    fn login_shell_from_identity() -> Result<()> {
        let identity = user::Identity::parse("root")?;
        let Some(expected) = identity.shell().map(Path::to_path_buf) else {
            return Ok(());
        };
        let spec = Builder::new()
            .identity(identity)
            .login_shell(true)
            .command(vec!["echo".to_owned(), "a b".to_owned()])
            .build()?;

        let target = prepare(&spec, &env())?;
        assert_eq!(
            strings(target.argv()),
            [expected.to_string_lossy().into_owned(), "-c".to_owned(), "echo 'a b'".to_owned()]
        );
        Ok(())
    }

    #[test]
    fn login_shell_fallback() -> Result<()> {
        let spec = Builder::new()
            .identity(Identity::new(Uid::from_raw(1), Gid::from_raw(1)))
            .login_shell(true)
            .command(vec!["true".to_owned()])
            .build()?;
        assert_eq!(shell(&spec), *SHELL);
        Ok(())
    }

    #[test]
    fn missing_program() -> Result<()> {
        let spec = Builder::new()
            .command(vec!["no-such-program-anywhere".to_owned()])
            .build()?;
        let error = prepare(&spec, &env()).expect_err("found a missing program");
        assert_eq!(error.code(), spawn::EXEC_FAILURE);
        Ok(())
    }
}
