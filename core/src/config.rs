//! Configuration loading and validation for the echolog server
//!
//! Parses a TOML configuration into [`ServerConfig`], applies defaults via
//! serde, and performs strict validation with field-path error messages.

use crate::{Result, ServerError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default TCP port clients connect to
pub const DEFAULT_PORT: u16 = 9000;
/// Default pending-connection backlog passed to `listen(2)`
pub const DEFAULT_BACKLOG: u32 = 10;
/// Default path of the shared append-only log store
pub const DEFAULT_DATA_FILE: &str = "/var/tmp/echologdata";
/// Default path of the daemon-mode log file
pub const DEFAULT_LOG_FILE: &str = "/var/tmp/echologd.log";

/// Configuration for the echolog server
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerConfig {
    /// Host to bind the listener to (IPv4)
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind the listener to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Pending-connection backlog
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Path of the shared append-only log store
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    /// Path of the log file used in daemon mode
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Log level for the server
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_backlog() -> u32 {
    DEFAULT_BACKLOG
}

fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            backlog: default_backlog(),
            data_file: default_data_file(),
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Validate the configuration, returning field-path error messages
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ServerError::Validation("host: cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ServerError::Validation(
                "port: must be 1..=65535".to_string(),
            ));
        }
        if self.backlog == 0 {
            return Err(ServerError::Validation(
                "backlog: must be > 0".to_string(),
            ));
        }
        if self.data_file.as_os_str().is_empty() {
            return Err(ServerError::Validation(
                "dataFile: cannot be empty".to_string(),
            ));
        }
        if !self.data_file.is_absolute() {
            return Err(ServerError::Validation(
                "dataFile: must be an absolute path".to_string(),
            ));
        }
        if self.log_file.as_os_str().is_empty() {
            return Err(ServerError::Validation(
                "logFile: cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The address string the listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load a server configuration from a TOML file path
pub fn load_from_toml_path(path: impl AsRef<Path>) -> Result<ServerConfig> {
    let data = fs::read_to_string(&path).map_err(|e| {
        ServerError::Configuration(format!("Failed to read config {:?}: {}", path.as_ref(), e))
    })?;
    load_from_toml_str(&data)
}

/// Load a server configuration from a TOML string
pub fn load_from_toml_str(input: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = toml::from_str(input)
        .map_err(|e| ServerError::Configuration(format!("TOML parse error: {}", e)))?;
    cfg.validate()?;
    Ok(cfg)
}
