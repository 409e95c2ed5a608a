//! Resolve a program name the way `execvp` does, but against an explicit
//! `PATH` value instead of the caller's own environment.

use std::{
    ffi::OsStr,
    os::unix::{ffi::OsStrExt, fs::PermissionsExt},
    path::{Path, PathBuf},
};

/// The search path used when the environment has no `PATH`.
pub const DEFAULT_PATH: &str = "/usr/local/bin:/bin:/usr/bin";

#[derive(Debug)]
pub enum Error {
    NotFound(String),
}
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(e) => write!(f, "Could not find {e} in path"),
        }
    }
}
impl std::error::Error for Error {}

/// Whether `path` is a regular file with any execute bit set.
fn executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Resolve `name` against `path`, or `DEFAULT_PATH` if `path` is None.
///
/// Names containing a `/` are returned as-is, without being checked; the
/// exec itself reports whether they exist. An empty `PATH` component means
/// the current directory.
///
/// ## Examples
/// ```rust
/// let sh = which::which_in("sh", Some("/bin:/usr/bin".as_ref())).unwrap();
/// assert!(sh.ends_with("sh"));
/// ```
pub fn which_in(name: impl AsRef<OsStr>, path: Option<&OsStr>) -> Result<PathBuf, Error> {
    let name = name.as_ref();
    let missing = || Error::NotFound(name.to_string_lossy().into_owned());
    if name.is_empty() {
        return Err(missing());
    }
    if name.as_bytes().contains(&b'/') {
        return Ok(PathBuf::from(name));
    }

    let path = path.unwrap_or(OsStr::new(DEFAULT_PATH));
    path.as_bytes()
        .split(|byte| *byte == b':')
        .map(|root| {
            if root.is_empty() {
                Path::new(".").join(name)
            } else {
                Path::new(OsStr::from_bytes(root)).join(name)
            }
        })
        .find(|candidate| executable(candidate))
        .ok_or_else(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn slash_passthrough() -> Result<()> {
        assert_eq!(
            which_in("./does/not/exist", None)?,
            PathBuf::from("./does/not/exist")
        );
        Ok(())
    }

    #[test]
    fn search_order() -> Result<()> {
        let found = which_in("sh", Some(OsStr::new("/nonexistent:/bin:/usr/bin")))?;
        assert!(found == Path::new("/bin/sh") || found == Path::new("/usr/bin/sh"));
        Ok(())
    }

    #[test]
    fn missing() {
        assert!(which_in("definitely-not-a-program", Some(OsStr::new("/bin"))).is_err());
        assert!(which_in("", None).is_err());
    }

    #[test]
    fn raw_bytes() -> Result<()> {
        let name = OsStr::from_bytes(b"./caf\xe9");
        assert_eq!(which_in(name, None)?, Path::new(name));
        Ok(())
    }

    #[test]
    fn not_executable() {
        // /etc/passwd exists but is never executable.
        assert!(which_in("passwd", Some(OsStr::new("/etc"))).is_err());
    }
}
