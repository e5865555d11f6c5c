//! Double-fork daemonization
//!
//! Detaches the process from its controlling terminal and session before
//! the async runtime exists. Must be called while the process is still
//! single-threaded; fork and runtime worker threads do not mix.
//!
//! Steps, all-or-nothing:
//! 1. fork, parent exits 0
//! 2. setsid (new session, no controlling terminal)
//! 3. fork again, intermediate child exits 0 (the survivor can never
//!    reacquire a controlling terminal)
//! 4. stdin/stdout/stderr redirected to the null device
//! 5. umask reset to 0
//! 6. working directory changed to /

#![cfg(unix)]

use std::os::fd::AsRawFd;

use nix::sys::stat::{umask, Mode};
use nix::unistd::{chdir, dup2, fork, setsid, ForkResult};

use crate::{DaemonError, Result};

/// Enter background mode.
///
/// On success the caller continues as the detached grandchild; the
/// intermediate processes have already exited 0. Any failure is fatal to
/// the caller.
pub fn daemonize() -> Result<()> {
    // Safety: the process is single-threaded at this point; the caller has
    // not started the tokio runtime yet.
    match unsafe { fork() }.map_err(|e| step_error("fork", e))? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    setsid().map_err(|e| step_error("setsid", e))?;

    match unsafe { fork() }.map_err(|e| step_error("second fork", e))? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    let devnull = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")?;
    let null_fd = devnull.as_raw_fd();
    for stdio_fd in 0..=2 {
        dup2(null_fd, stdio_fd).map_err(|e| step_error("stdio redirect", e))?;
    }

    umask(Mode::empty());

    chdir("/").map_err(|e| step_error("chdir", e))?;

    Ok(())
}

fn step_error(step: &'static str, source: nix::Error) -> DaemonError {
    DaemonError::Daemonize { step, source }
}
