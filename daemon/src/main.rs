//! echologd binary
//!
//! Binds the listener, optionally detaches into the background, installs
//! signal handlers and serves until terminated. Fatal setup failures exit
//! non-zero before any cleanup of a log store that may not exist yet.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use echolog_daemon::Daemon;
use echolog_core::{config, ServerConfig, ShutdownController};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "echologd")]
#[command(about = "A TCP server that logs newline-delimited records and echoes the full log back")]
#[command(version)]
struct Cli {
    /// Detach from the terminal and run in the background
    #[arg(short = 'd', long = "daemon")]
    daemon: bool,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Path of the shared log store (overrides config)
    #[arg(long, value_name = "FILE")]
    data_file: Option<PathBuf>,

    /// Path of the daemon-mode log file (overrides config)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn resolve_config(&self) -> echolog_core::Result<ServerConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from_toml_path(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = &self.host {
            cfg.host = host.clone();
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(data_file) = &self.data_file {
            cfg.data_file = data_file.clone();
        }
        if let Some(log_file) = &self.log_file {
            cfg.log_file = log_file.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("echologd: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Bind before detaching so bind failures reach the invoking terminal.
    let listener = match echolog_core::server::bind_listener(&config) {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("echologd: {}", e);
            return ExitCode::FAILURE;
        }
    };

    #[cfg(unix)]
    if cli.daemon {
        if let Err(e) = echolog_daemon::daemonize::daemonize() {
            eprintln!("echologd: {}", e);
            return ExitCode::FAILURE;
        }
    }
    #[cfg(not(unix))]
    if cli.daemon {
        eprintln!("echologd: daemon mode is only supported on Unix");
        return ExitCode::FAILURE;
    }

    // Logging goes to stdout in the foreground, or to the log file once
    // stdout points at the null device.
    let tracing_init = if cli.daemon {
        echolog_core::utils::init_tracing_to_file(&config.log_level, &config.log_file)
    } else {
        echolog_core::utils::init_tracing(&config.log_level)
    };
    if let Err(e) = tracing_init {
        eprintln!("echologd: {}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let controller = ShutdownController::new();
        #[cfg(unix)]
        echolog_daemon::install_signal_handlers(&controller)?;

        info!("echologd starting on {}", config.bind_addr());
        Daemon::new(config).run(listener, &controller).await
    });

    match result {
        Ok(()) => {
            info!("echologd exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("echologd failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
