//! Resource limit requests, and which of them the host supports.

use nix::sys::resource::{Resource, rlim_t};
use std::fmt;

/// A requested soft limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    /// Leave the current soft limit alone.
    #[default]
    Unchanged,

    /// Set the soft limit to 0.
    Zero,

    /// Set the soft limit to this value, or the hard limit if it is lower.
    Value(u64),
}
impl Limit {
    /// The soft limit to write, given the current hard limit, or `None`
    /// to leave it alone. The result never exceeds `hard`.
    pub fn soft(self, hard: rlim_t) -> Option<rlim_t> {
        match self {
            Self::Unchanged => None,
            Self::Zero => Some(0),
            Self::Value(value) => Some(rlim_t::try_from(value).unwrap_or(rlim_t::MAX).min(hard)),
        }
    }
}
impl From<i64> for Limit {
    /// Command line values: anything negative means 0.
    fn from(value: i64) -> Self {
        u64::try_from(value).map_or(Self::Zero, Self::Value)
    }
}

/// The resources a limit can be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    /// The data segment.
    Data,

    /// The stack.
    Stack,

    /// Memory locked into RAM.
    LockedMemory,

    /// Virtual address space.
    AddressSpace,

    /// Open descriptors.
    OpenFiles,

    /// Processes of the real user.
    Processes,

    /// Size of files written.
    FileSize,

    /// Size of core dumps.
    Core,

    /// Resident set size.
    ResidentSet,

    /// CPU seconds.
    CpuTime,
}
impl ResourceKind {
    /// The platform resource, or `None` if this host cannot limit it.
    pub fn resource(self) -> Option<Resource> {
        match self {
            Self::Data => Some(Resource::RLIMIT_DATA),
            Self::Stack => Some(Resource::RLIMIT_STACK),
            Self::OpenFiles => Some(Resource::RLIMIT_NOFILE),
            Self::FileSize => Some(Resource::RLIMIT_FSIZE),
            Self::Core => Some(Resource::RLIMIT_CORE),
            Self::CpuTime => Some(Resource::RLIMIT_CPU),

            #[cfg(target_os = "linux")]
            Self::LockedMemory => Some(Resource::RLIMIT_MEMLOCK),
            #[cfg(target_os = "linux")]
            Self::AddressSpace => Some(Resource::RLIMIT_AS),
            #[cfg(target_os = "linux")]
            Self::Processes => Some(Resource::RLIMIT_NPROC),
            #[cfg(target_os = "linux")]
            Self::ResidentSet => Some(Resource::RLIMIT_RSS),

            #[cfg(not(target_os = "linux"))]
            Self::LockedMemory | Self::AddressSpace | Self::Processes | Self::ResidentSet => None,
        }
    }
}
impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Data => "data segment",
            Self::Stack => "stack",
            Self::LockedMemory => "locked memory",
            Self::AddressSpace => "address space",
            Self::OpenFiles => "open files",
            Self::Processes => "processes",
            Self::FileSize => "file size",
            Self::Core => "core size",
            Self::ResidentSet => "resident set",
            Self::CpuTime => "cpu time",
        };
        write!(f, "{name}")
    }
}
