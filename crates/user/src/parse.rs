//! Resolution of textual identities.
//!
//! Two forms are accepted, and never mixed within one specification:
//!
//! * `name[:group[:group...]]` looks every component up in the system
//!   database. Without a group, the user's primary group is used.
//! * `:uid[:gid[:gid...]]` takes every component as an unsigned decimal.
//!   Without a gid, the uid doubles as the primary group.

use crate::Identity;
use nix::{
    errno::Errno,
    unistd::{Gid, Group, Uid, User},
};
use thiserror::Error;

/// The most groups a single specification may name.
pub const MAX_GROUPS: usize = 60;

/// Errors resolving an identity specification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Nothing to resolve.
    #[error("empty identity")]
    Empty,

    /// A numeric specification had a component that is not a decimal number.
    #[error("malformed numeric identity: '{0}'")]
    Malformed(String),

    /// No such user in the password database.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// No such group in the group database.
    #[error("unknown group: {0}")]
    UnknownGroup(String),

    /// More groups than a process may be given here.
    #[error("more than 60 groups in '{0}'")]
    TooManyGroups(String),

    /// The database lookup itself failed.
    #[error("failed to query the user database: {0}")]
    Lookup(#[from] Errno),
}

/// Parse `user[:group...]` or `:uid[:gid...]`.
pub(crate) fn parse(spec: &str) -> Result<Identity, Error> {
    match spec.strip_prefix(':') {
        Some(rest) => numeric(spec, rest),
        None => named(spec),
    }
}

/// Parse a single decimal component. Signs, whitespace and empty
/// components are all rejected.
fn number(spec: &str, component: &str) -> Result<u32, Error> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Malformed(spec.to_owned()));
    }
    component
        .parse()
        .map_err(|_| Error::Malformed(spec.to_owned()))
}

fn numeric(spec: &str, rest: &str) -> Result<Identity, Error> {
    let mut components = rest.split(':');
    let uid = number(spec, components.next().unwrap_or_default())?;

    let mut gids = components
        .map(|component| number(spec, component).map(Gid::from_raw))
        .collect::<Result<Vec<_>, _>>()?;

    if gids.len() > MAX_GROUPS {
        return Err(Error::TooManyGroups(spec.to_owned()));
    }
    if gids.is_empty() {
        gids.push(Gid::from_raw(uid));
    }

    Ok(Identity {
        uid: Uid::from_raw(uid),
        gids,
        shell: None,
    })
}

fn named(spec: &str) -> Result<Identity, Error> {
    let mut components = spec.split(':');
    let name = components.next().unwrap_or_default();
    if name.is_empty() {
        return Err(Error::Empty);
    }

    let user = User::from_name(name)?.ok_or_else(|| Error::UnknownUser(name.to_owned()))?;

    let mut gids = components
        .map(|group| match Group::from_name(group)? {
            Some(entry) => Ok(entry.gid),
            None => Err(Error::UnknownGroup(group.to_owned())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if gids.len() > MAX_GROUPS {
        return Err(Error::TooManyGroups(spec.to_owned()));
    }
    if gids.is_empty() {
        gids.push(user.gid);
    }

    let shell = (!user.shell.as_os_str().is_empty()).then_some(user.shell);
    Ok(Identity {
        uid: user.uid,
        gids,
        shell,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;

    fn raw(identity: &Identity) -> (u32, Vec<u32>) {
        (
            identity.uid().as_raw(),
            identity.gids().iter().map(|gid| gid.as_raw()).collect(),
        )
    }

    #[test]
    fn numeric_groups() -> Result<()> {
        let identity = parse(":1000:1000:27")?;
        assert_eq!(raw(&identity), (1000, vec![1000, 27]));
        assert!(identity.shell().is_none());
        Ok(())
    }

    #[test]
    fn numeric_uid_only() -> Result<()> {
        assert_eq!(raw(&parse(":4242")?), (4242, vec![4242]));
        Ok(())
    }

    #[test]
    fn numeric_malformed() {
        for spec in [":1000:", ":1000:abc", ":", "::1", ":-1", ":10 :2", ":1:+2"] {
            assert_eq!(
                parse(spec),
                Err(Error::Malformed(spec.to_owned())),
                "{spec} should be rejected"
            );
        }
    }

    #[test]
    fn numeric_overflow() {
        assert!(matches!(parse(":99999999999"), Err(Error::Malformed(_))));
    }

    #[test]
    fn too_many_groups() {
        let spec = format!(":1{}", ":2".repeat(MAX_GROUPS + 1));
        assert_eq!(parse(&spec), Err(Error::TooManyGroups(spec.clone())));

        let spec = format!(":1{}", ":2".repeat(MAX_GROUPS));
        assert!(parse(&spec).is_ok());
    }

    #[test]
    fn root() -> Result<()> {
        let identity = parse("root")?;
        assert!(identity.uid().is_root());
        assert_eq!(identity.primary().as_raw(), 0);
        assert_eq!(parse("root:root")?.gids(), identity.gids());
        Ok(())
    }

    #[test]
    fn unknown() {
        assert_eq!(
            parse("no-such-user-here"),
            Err(Error::UnknownUser("no-such-user-here".to_owned()))
        );
        assert_eq!(
            parse("root:no-such-group-here"),
            Err(Error::UnknownGroup("no-such-group-here".to_owned()))
        );
        assert_eq!(parse(""), Err(Error::Empty));
    }

    #[test]
    fn group_order() -> Result<()> {
        // Pick the last two groups in the database so their order is unlikely
        // to match their numeric order.
        let groups = fs::read_to_string("/etc/group")?;
        let names: Vec<&str> = groups
            .lines()
            .filter_map(|line| line.split(':').next())
            .filter(|name| !name.is_empty())
            .collect();
        let [.., first, second] = names.as_slice() else {
            return Ok(());
        };

        let lookup = |name: &str| -> Result<u32> {
            Ok(Group::from_name(name)?
                .map(|group| group.gid.as_raw())
                .unwrap_or_default())
        };

        let identity = parse(&format!("root:{second}:{first}"))?;
        assert_eq!(raw(&identity).1, vec![lookup(*second)?, lookup(*first)?]);
        Ok(())
    }
}
