pub mod env;
pub mod logger;

use std::{ffi::OsStr, path::Path};

/// The name a program was invoked as: the last component of `argv[0]`.
pub fn invoked_name(argv0: Option<&OsStr>) -> String {
    argv0
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
