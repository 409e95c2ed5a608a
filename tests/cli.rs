use anyhow::Result;
use assert_cmd::prelude::*;
use nix::{
    fcntl::{Flock, FlockArg},
    unistd::getuid,
};
use predicates::str::{contains, diff};
use std::{
    ffi::OsStr,
    fs,
    os::unix::{ffi::OsStrExt, fs::symlink},
    path::PathBuf,
    process::Command,
};
use tempfile::TempDir;

fn envmod() -> Result<Command> {
    Ok(Command::cargo_bin("envmod")?)
}

/// Run the binary under another name.
fn personality(dir: &TempDir, name: &str) -> Result<Command> {
    let link = dir.path().join(name);
    if !link.exists() {
        symlink(assert_cmd::cargo::cargo_bin("envmod"), &link)?;
    }
    Ok(Command::new(link))
}

#[test]
fn env_dir() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("FOO"), "")?;
    fs::write(dir.path().join("BAR"), "  baz\n")?;

    envmod()?
        .env("FOO", "bar")
        .arg("-e")
        .arg(dir.path())
        .args(["sh", "-c", r#"echo "${FOO-unset} $BAR""#])
        .assert()
        .success()
        .stdout(diff("unset baz\n"));
    Ok(())
}

#[test]
fn env_dir_separator() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("BAD"), "a=b")?;

    envmod()?
        .arg("-e")
        .arg(dir.path())
        .arg("true")
        .assert()
        .code(100)
        .stderr(contains("'=' is not allowed"));
    Ok(())
}

#[test]
fn env_file() -> Result<()> {
    let dir = TempDir::new()?;
    let file = dir.path().join("env");
    fs::write(&file, "X=1\nY=\nnotakeyvalueline\nZ=3\n")?;

    envmod()?
        .env("Y", "set")
        .arg("-E")
        .arg(&file)
        .args(["sh", "-c", r#"echo "$X ${Y-unset} $Z""#])
        .assert()
        .success()
        .stdout(diff("1 unset 3\n"));
    Ok(())
}

#[test]
fn env_file_nul() -> Result<()> {
    let dir = TempDir::new()?;
    let file = dir.path().join("env");
    fs::write(&file, "X=1\nY=a\0b\n")?;

    envmod()?
        .arg("-E")
        .arg(&file)
        .arg("true")
        .assert()
        .code(100)
        .stderr(contains("line 2"))
        .stderr(contains("NUL"));
    Ok(())
}

#[test]
fn missing_env_file() -> Result<()> {
    envmod()?
        .args(["-E", "/nonexistent/env", "true"])
        .assert()
        .code(111);
    Ok(())
}

#[test]
fn assignments() -> Result<()> {
    envmod()?
        .args(["A=1", "B=two words", "sh", "-c", r#"echo "$A $B""#])
        .assert()
        .success()
        .stdout(diff("1 two words\n"));
    Ok(())
}

#[test]
fn env_identity() -> Result<()> {
    envmod()?
        .args(["-U", ":123:456", "env"])
        .assert()
        .success()
        .stdout(contains("UID=123\n"))
        .stdout(contains("GID=456\n"));
    Ok(())
}

#[test]
fn clear_keep() -> Result<()> {
    envmod()?
        .env_clear()
        .env("PATH", "/usr/bin:/bin")
        .env("OTHER", "x")
        .args(["-x", "-k", "PATH", "-k", "MISSING", "env"])
        .assert()
        .success()
        .stdout(diff("PATH=/usr/bin:/bin\n"))
        .stderr(contains("MISSING"));
    Ok(())
}

#[test]
fn unset() -> Result<()> {
    envmod()?
        .env("GONE", "1")
        .args(["--unset", "GONE", "sh", "-c", r#"echo "${GONE-unset}""#])
        .assert()
        .success()
        .stdout(diff("unset\n"));
    Ok(())
}

#[test]
fn argv0() -> Result<()> {
    envmod()?
        .args(["-b", "renamed", "sh", "-c", "echo $0"])
        .assert()
        .success()
        .stdout(diff("renamed\n"));
    Ok(())
}

#[test]
fn chdir() -> Result<()> {
    let dir = TempDir::new()?;
    let expected = format!("{}\n", dir.path().canonicalize()?.display());

    envmod()?
        .arg("-C")
        .arg(dir.path())
        .args(["sh", "-c", "pwd -P"])
        .assert()
        .success()
        .stdout(diff(expected));
    Ok(())
}

#[test]
fn close_stdout() -> Result<()> {
    envmod()?
        .args(["-1", "echo", "hello"])
        .assert()
        .failure()
        .stdout(diff(""));
    Ok(())
}

#[test]
fn nice() -> Result<()> {
    // SAFETY: An increment of 0 only reads the current value.
    let base = unsafe { nix::libc::nice(0) };
    let expected = (base + 5).min(19);

    envmod()?
        .args(["-n", "5", "nice"])
        .assert()
        .success()
        .stdout(diff(format!("{expected}\n")));
    Ok(())
}

#[test]
fn exit_status() -> Result<()> {
    envmod()?.args(["sh", "-c", "exit 7"]).assert().code(7);
    Ok(())
}

#[test]
fn exec_failure() -> Result<()> {
    envmod()?
        .arg("no-such-program-anywhere")
        .assert()
        .code(127)
        .stderr(contains("no-such-program-anywhere"));
    Ok(())
}

#[test]
fn usage() -> Result<()> {
    envmod()?.assert().code(100);
    envmod()?.args(["-u", ":1000:", "true"]).assert().code(100);
    envmod()?.args(["--trap", "NOTASIGNAL=true", "true"]).assert().code(100);
    envmod()?
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Usage"));
    Ok(())
}

#[test]
fn raw_arguments() -> Result<()> {
    let word = OsStr::from_bytes(b"caf\xe9");
    envmod()?
        .arg("-b")
        .arg(word)
        .args(["sh", "-c", r#"printf '%s %s' "$0" "$1""#])
        .arg(word)
        .assert()
        .success()
        .stdout(&b"caf\xe9 caf\xe9"[..]);
    Ok(())
}

#[test]
fn raw_assignment() -> Result<()> {
    envmod()?
        .arg(OsStr::from_bytes(b"WORD=caf\xe9"))
        .args(["sh", "-c", r#"printf '%s' "$WORD""#])
        .assert()
        .success()
        .stdout(&b"caf\xe9"[..]);
    Ok(())
}

#[test]
fn unrelayable_signals() -> Result<()> {
    for flag in [["--ignore", "KILL"], ["--ignore", "STOP"], ["--trap", "CHLD=true"]] {
        envmod()?
            .args(flag)
            .arg("true")
            .assert()
            .code(100)
            .stderr(contains("cannot be trapped or ignored"));
    }
    Ok(())
}

#[test]
fn path_from_edited_environment() -> Result<()> {
    let dir = TempDir::new()?;
    envmod()?
        .env("PATH", "/usr/bin:/bin")
        .arg(format!("PATH={}", dir.path().display()))
        .arg("true")
        .assert()
        .code(127);
    Ok(())
}

mod lock {
    use super::*;
    use std::fs::File;

    fn held(dir: &TempDir) -> Result<(PathBuf, Flock<File>)> {
        let path = dir.path().join("lock");
        let lock = Flock::lock(File::create(&path)?, FlockArg::LockExclusiveNonblock)
            .map_err(|(_, errno)| errno)?;
        Ok((path, lock))
    }

    #[test]
    fn busy() -> Result<()> {
        let dir = TempDir::new()?;
        let (path, _lock) = held(&dir)?;

        envmod()?
            .arg("-l")
            .arg(&path)
            .arg("true")
            .assert()
            .code(111)
            .stderr(contains("held elsewhere"));
        Ok(())
    }

    #[test]
    fn timeout() -> Result<()> {
        let dir = TempDir::new()?;
        let (path, _lock) = held(&dir)?;

        envmod()?
            .arg("-L")
            .arg(&path)
            .args(["--lock-timeout", "1", "true"])
            .assert()
            .code(111)
            .stderr(contains("timed out"));
        Ok(())
    }

    #[test]
    fn setlock_quiet() -> Result<()> {
        let dir = TempDir::new()?;
        let (path, _lock) = held(&dir)?;
        let marker = dir.path().join("ran");

        personality(&dir, "setlock")?
            .args(["-n", "-x"])
            .arg(&path)
            .arg("touch")
            .arg(&marker)
            .assert()
            .code(0);
        assert!(!marker.exists());

        personality(&dir, "setlock")?
            .arg("-n")
            .arg(&path)
            .arg("true")
            .assert()
            .code(111);
        Ok(())
    }

    #[test]
    fn created_and_inherited() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("new-lock");

        envmod()?
            .arg("-l")
            .arg(&path)
            .args(["sh", "-c", "ls -l /proc/$$/fd"])
            .assert()
            .success()
            .stdout(contains(path.to_string_lossy().into_owned()));
        assert!(path.exists());
        Ok(())
    }
}

mod personalities {
    use super::*;

    #[test]
    fn envdir() -> Result<()> {
        let dir = TempDir::new()?;
        let env = dir.path().join("env");
        fs::create_dir(&env)?;
        fs::write(env.join("GREETING"), "hello\0world\n")?;

        personality(&dir, "envdir")?
            .arg(&env)
            .args(["sh", "-c", r#"printf '%s' "$GREETING""#])
            .assert()
            .success()
            .stdout(diff("hello\nworld"));
        Ok(())
    }

    #[test]
    fn envuidgid() -> Result<()> {
        let dir = TempDir::new()?;
        personality(&dir, "envuidgid")?
            .args([":5:6", "sh", "-c", r#"echo "$GID""#])
            .assert()
            .success()
            .stdout(diff("6\n"));
        Ok(())
    }

    #[test]
    fn setuidgid_unprivileged() -> Result<()> {
        if getuid().is_root() {
            return Ok(());
        }
        let dir = TempDir::new()?;
        personality(&dir, "setuidgid")?
            .args([":0:0", "true"])
            .assert()
            .code(111)
            .stderr(contains("setgroups"));
        Ok(())
    }

    #[test]
    fn softlimit() -> Result<()> {
        let dir = TempDir::new()?;
        personality(&dir, "softlimit")?
            .args(["-c", "0", "sh", "-c", "ulimit -c"])
            .assert()
            .success()
            .stdout(diff("0\n"));
        Ok(())
    }

    #[test]
    fn pgrphack() -> Result<()> {
        let dir = TempDir::new()?;
        // A session leader's session id is its own pid.
        personality(&dir, "pgrphack")?
            .args(["sh", "-c", r#"test "$(ps -o sid= -p $$ | tr -d ' ')" = "$$""#])
            .assert()
            .success();
        Ok(())
    }

    #[test]
    fn unknown_name() -> Result<()> {
        let dir = TempDir::new()?;
        personality(&dir, "mystery")?
            .args(["-b", "renamed", "sh", "-c", "echo $0"])
            .assert()
            .success()
            .stdout(diff("renamed\n"))
            .stderr(contains("mystery: warning"));
        Ok(())
    }
}
