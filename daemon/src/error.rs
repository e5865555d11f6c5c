//! Daemon-level error types

use thiserror::Error;

/// Errors specific to the daemon binary
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error(transparent)]
    Core(#[from] echolog_core::ServerError),

    #[cfg(unix)]
    #[error("Daemonization failed at {step}: {source}")]
    Daemonize {
        step: &'static str,
        #[source]
        source: nix::Error,
    },

    #[error("Signal handler installation failed: {0}")]
    SignalInstall(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon-specific result type
pub type Result<T> = std::result::Result<T, DaemonError>;
