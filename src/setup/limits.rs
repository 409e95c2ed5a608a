//! Soft resource limits.

use crate::{
    Error,
    launch::{Limit, ResourceKind},
};
use log::{debug, warn};
use nix::sys::resource::{getrlimit, setrlimit};

/// Lower or raise one soft limit, never above its hard limit.
pub fn apply(kind: ResourceKind, limit: Limit) -> Result<(), Error> {
    let Some(resource) = kind.resource() else {
        warn!("Cannot limit {kind} on this platform");
        return Ok(());
    };

    let (soft, hard) = getrlimit(resource).map_err(|errno| Error::Limit(kind, errno))?;
    if let Some(new) = limit.soft(hard) {
        setrlimit(resource, new, hard).map_err(|errno| Error::Limit(kind, errno))?;
        debug!("{kind} limit: {soft} -> {new} (hard {hard})");
    }
    Ok(())
}
