//! Core functionality for the echolog server
//!
//! This crate contains the configuration, error types, log store and the
//! TCP server (acceptor loop, connection workers, shutdown controller)
//! shared by the daemon binary and the test suites.

pub mod config;
pub mod error;
pub mod logstore;
pub mod server;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use logstore::LogStore;
pub use server::shutdown::{ShutdownController, ShutdownSignal};
pub use server::Server;

/// Core utilities and helper functions
pub mod utils {
    use std::path::Path;

    use tracing::info;

    /// Initialize tracing for foreground operation, writing to stdout.
    ///
    /// `RUST_LOG` takes precedence over the configured level.
    pub fn init_tracing(level: &str) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| crate::ServerError::Initialization(e.to_string()))?;

        info!("Tracing initialized with level: {}", level);
        Ok(())
    }

    /// Initialize tracing for detached operation, appending to a log file.
    ///
    /// Used after daemonization, once stdout and stderr point at the null
    /// device.
    pub fn init_tracing_to_file(level: &str, path: &Path) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                crate::ServerError::Initialization(format!(
                    "Failed to open log file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .try_init()
            .map_err(|e| crate::ServerError::Initialization(e.to_string()))?;

        info!("Tracing initialized with level: {}", level);
        Ok(())
    }
}
