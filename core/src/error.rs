//! Server error types and utilities

use thiserror::Error;

/// Errors produced by the echolog server core
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Log store error: {0}")]
    LogStore(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Whether this error is fatal at startup (the process should exit
    /// non-zero) as opposed to a per-connection or transient failure.
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            ServerError::Configuration(_)
                | ServerError::Validation(_)
                | ServerError::Initialization(_)
                | ServerError::Bind { .. }
        )
    }
}

/// Core-specific result type
pub type Result<T> = std::result::Result<T, ServerError>;
