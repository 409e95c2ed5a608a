//! Environment directories: one file per variable, named after the key.
//!
//! An empty file removes the key. Otherwise the content, with surrounding
//! whitespace trimmed and NUL bytes turned into newlines, is the value.

use super::{EnvEdit, Error};
use log::{debug, warn};
use std::{
    ffi::OsString,
    fs,
    os::unix::ffi::{OsStrExt, OsStringExt},
    path::Path,
};

/// Read a directory into edits, sorted by key.
///
/// Entries that cannot be read are skipped with a warning. A value
/// containing `=` is an error.
pub fn load(dir: &Path) -> Result<Vec<EnvEdit>, Error> {
    let open = |source| Error::Open {
        path: dir.to_owned(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(open)? {
        match entry {
            Ok(entry) if !entry.file_name().as_bytes().starts_with(b".") => {
                entries.push(entry.file_name());
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to list {}: {e}", dir.display()),
        }
    }
    entries.sort();

    let mut edits = Vec::with_capacity(entries.len());
    for key in entries {
        let path = dir.join(&key);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };

        match value(content) {
            None => edits.push(EnvEdit::Unset(key)),
            Some(value) if value.contains(&b'=') => return Err(Error::Separator { path }),
            Some(value) => edits.push(EnvEdit::Set(key, OsString::from_vec(value))),
        }
    }

    debug!("Loaded {} edits from {}", edits.len(), dir.display());
    Ok(edits)
}

/// Decode the content of an entry. `None` means the key is removed.
fn value(content: Vec<u8>) -> Option<Vec<u8>> {
    if content.is_empty() {
        return None;
    }

    // Vertical tab is whitespace to the shell, but not to `trim_ascii`.
    let space = |b: &u8| b.is_ascii_whitespace() || *b == b'\x0b';
    let start = content.iter().position(|b| !space(b)).unwrap_or(content.len());
    let end = content.iter().rposition(|b| !space(b)).map_or(start, |end| end + 1);

    Some(
        content[start..end]
            .iter()
            .map(|&b| if b == 0 { b'\n' } else { b })
            .collect(),
    )
}
