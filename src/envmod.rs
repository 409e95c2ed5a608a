//! The envmod executable. What it accepts depends on the name it is run as.

use envmod::{
    Error,
    cli::{Personality, Resolve},
    error::USAGE,
    exec,
    setup::Process,
    shared::{self, logger},
};
use log::{debug, error};
use nix::sys::signal::{SigHandler, Signal, signal};
use std::{env, ffi::OsString, process::exit};

fn main() {
    let args: Vec<OsString> = env::args_os().collect();
    let name = shared::invoked_name(args.first().map(OsString::as_os_str));
    logger::init(&name);

    // The runtime ignores SIGPIPE, which the target would otherwise inherit.
    // SAFETY: Nothing else is running, and no handler is being installed.
    if let Err(errno) = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) } {
        debug!("Cannot restore SIGPIPE: {errno}");
    }

    // Taken before anything else can touch the environment.
    let process = Process::current();

    let personality = match Personality::parse(&name, &args) {
        Ok(personality) => personality,
        Err(e) => {
            let _ = e.print();
            exit(if e.use_stderr() { USAGE } else { 0 })
        }
    };
    logger::verbose(personality.verbosity());

    let code = match personality
        .resolve()
        .and_then(|spec| exec::run(spec, process))
    {
        Ok(code) => code,
        Err(Error::Busy(path)) => {
            debug!("{} is locked, not running", path.display());
            0
        }
        Err(e) => {
            error!("{e}");
            e.code()
        }
    };
    exit(code)
}
