//! Replace the current process with a target program, or fork it and relay
//! signals to it until it terminates.

mod exec;
mod fork;
pub mod signal;
mod supervise;
mod trap;

pub use exec::Error;
pub use exec::Exec;
pub use exec::Prepared;
pub use supervise::Action;
pub use supervise::Outcome;
pub use supervise::Policy;
pub use supervise::Supervisor;

/// The status a forked child exits with when the target cannot be executed.
pub const EXEC_FAILURE: i32 = 127;

/// The status the supervisor exits with when the child was killed by a signal.
pub const SIGNALED: i32 = 120;

/// The status the supervisor exits with when the child ended in any other way.
pub const ABNORMAL: i32 = 121;
