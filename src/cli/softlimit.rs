//! `softlimit`: run a command with lowered resource limits.
//!
//! Every value is a count in the resource's unit. A negative value sets
//! the limit to 0; a value above the hard limit is clamped to it.

use super::Resolve;
use crate::{
    Error,
    launch::{Builder, LaunchSpec, Limit, ResourceKind},
};
use std::ffi::OsString;

/// Resource limit flags shared with `envmod`.
#[derive(clap::Args, Debug, Default)]
pub struct Limits {
    /// Limit the data segment, stack, locked memory and address space.
    #[arg(short = 'm', value_name = "BYTES", allow_negative_numbers = true)]
    pub memory: Option<i64>,

    /// Limit the address space.
    #[arg(short = 'a', value_name = "BYTES", allow_negative_numbers = true)]
    pub address_space: Option<i64>,

    /// Limit the data segment.
    #[arg(short = 'd', value_name = "BYTES", allow_negative_numbers = true)]
    pub data: Option<i64>,

    /// Limit the number of open files.
    #[arg(short = 'o', value_name = "N", allow_negative_numbers = true)]
    pub open_files: Option<i64>,

    /// Limit the number of processes per user.
    #[arg(short = 'p', value_name = "N", allow_negative_numbers = true)]
    pub processes: Option<i64>,

    /// Limit the size of written files.
    #[arg(short = 'f', value_name = "BYTES", allow_negative_numbers = true)]
    pub file_size: Option<i64>,

    /// Limit the size of core dumps.
    #[arg(short = 'c', value_name = "BYTES", allow_negative_numbers = true)]
    pub core: Option<i64>,

    /// Limit the resident set size.
    #[arg(short = 'r', value_name = "BYTES", allow_negative_numbers = true)]
    pub resident_set: Option<i64>,

    /// Limit cpu time.
    #[arg(short = 't', value_name = "SECONDS", allow_negative_numbers = true)]
    pub cpu_time: Option<i64>,

    /// Limit the stack.
    #[arg(short = 's', value_name = "BYTES", allow_negative_numbers = true)]
    pub stack: Option<i64>,

    /// Limit locked memory.
    #[arg(short = 'M', value_name = "BYTES", allow_negative_numbers = true)]
    pub locked_memory: Option<i64>,
}
impl Limits {
    /// Add every given limit. `-m` applies first, so a specific flag for
    /// one of its resources wins.
    pub fn configure(&self, builder: &mut Builder) {
        if let Some(memory) = self.memory {
            for kind in [
                ResourceKind::Data,
                ResourceKind::Stack,
                ResourceKind::LockedMemory,
                ResourceKind::AddressSpace,
            ] {
                let _ = builder.limit(kind, Limit::from(memory));
            }
        }

        for (kind, value) in [
            (ResourceKind::AddressSpace, self.address_space),
            (ResourceKind::Data, self.data),
            (ResourceKind::OpenFiles, self.open_files),
            (ResourceKind::Processes, self.processes),
            (ResourceKind::FileSize, self.file_size),
            (ResourceKind::Core, self.core),
            (ResourceKind::ResidentSet, self.resident_set),
            (ResourceKind::CpuTime, self.cpu_time),
            (ResourceKind::Stack, self.stack),
            (ResourceKind::LockedMemory, self.locked_memory),
        ] {
            if let Some(value) = value {
                let _ = builder.limit(kind, Limit::from(value));
            }
        }
    }
}

/// Run a command with lowered resource limits.
#[derive(clap::Parser, Debug)]
#[command(name = "softlimit", version, about = "Run a command with lowered resource limits")]
pub struct Args {
    #[command(flatten)]
    pub limits: Limits,

    /// Limit locked memory, as `-M`.
    #[arg(short = 'l', value_name = "BYTES", allow_negative_numbers = true)]
    pub memlock: Option<i64>,

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
        let mut builder = Builder::new();
        self.limits.configure(&mut builder);
        if let Some(value) = self.memlock {
            let _ = builder.limit(ResourceKind::LockedMemory, Limit::from(value));
        }
        builder.command(self.command).build()
    }
}
