//! Environment files: `KEY=VALUE` lines, `KEY=` to remove a key.

use super::{EnvEdit, Error};
use log::{debug, warn};
use std::{ffi::OsString, fs, os::unix::ffi::OsStringExt, path::Path};

/// Read a file into edits, in line order. Lines without `=` are skipped.
pub fn load(file: &Path) -> Result<Vec<EnvEdit>, Error> {
    let content = fs::read(file).map_err(|source| Error::Open {
        path: file.to_owned(),
        source,
    })?;

    let mut edits = Vec::new();
    for (number, line) in content.split(|b| *b == b'\n').enumerate() {
        if line.contains(&0) {
            return Err(Error::Nul {
                path: file.to_owned(),
                line: number + 1,
            });
        }
        match parse(line) {
            Some(edit) => edits.push(edit),
            None => skipped(file, number, line),
        }
    }

    debug!("Loaded {} edits from {}", edits.len(), file.display());
    Ok(edits)
}

/// Parse one line, trimmed of surrounding whitespace.
fn parse(line: &[u8]) -> Option<EnvEdit> {
    let line = line.trim_ascii();
    let split = line.iter().position(|b| *b == b'=')?;
    let (key, value) = (&line[..split], &line[split + 1..]);
    if key.is_empty() {
        return None;
    }

    let key = OsString::from_vec(key.to_vec());
    Some(if value.is_empty() {
        EnvEdit::Unset(key)
    } else {
        EnvEdit::Set(key, OsString::from_vec(value.to_vec()))
    })
}

/// Only a line that looks like an assignment with no key is worth a warning.
fn skipped(file: &Path, number: usize, line: &[u8]) {
    if line.trim_ascii().starts_with(b"=") {
        warn!("{}:{}: missing key", file.display(), number + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environ::Environment;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn lines() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"X=1\nY=\nnotakeyvalueline\nZ=3\n")?;

        let mut environment: Environment = [("Y", "set")].into_iter().collect();
        environment.apply(&load(file.path())?);
        assert_eq!(
            environment,
            [("X", "1"), ("Z", "3")].into_iter().collect::<Environment>()
        );
        Ok(())
    }

    #[test]
    fn first_separator_splits() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"  URL=http://host/?a=b  \r\n=orphan\n\n")?;
        assert_eq!(
            load(file.path())?,
            [EnvEdit::Set("URL".into(), "http://host/?a=b".into())]
        );
        Ok(())
    }

    #[test]
    fn nul_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"OK=1\nX=a\0b\n")?;

        let error = load(file.path()).expect_err("NUL accepted");
        assert!(matches!(error, Error::Nul { line: 2, .. }));
        assert!(error.is_config());
        Ok(())
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            load(Path::new("/nonexistent/envfile")),
            Err(Error::Open { .. })
        ));
    }
}
