//! Daemon library for echolog
//!
//! Wires the core server to the operating system: signal handling,
//! runtime construction helpers and (on Unix) daemonization.

pub mod error;

#[cfg(unix)]
pub mod daemonize;

pub use error::{DaemonError, Result};

use echolog_core::{LogStore, Server, ServerConfig, ShutdownController};
use tokio::net::TcpListener;

/// The echolog daemon: owns the configuration and runs the server until
/// shutdown.
#[derive(Debug, Clone)]
pub struct Daemon {
    config: ServerConfig,
}

impl Daemon {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Run the server on an already-bound listener until the controller
    /// triggers shutdown.
    ///
    /// The listener is bound separately (and earlier) so that bind
    /// failures are reported on the invoking terminal before the process
    /// detaches.
    pub async fn run(
        self,
        listener: std::net::TcpListener,
        controller: &ShutdownController,
    ) -> Result<()> {
        let listener = TcpListener::from_std(listener)?;
        let store = LogStore::new(&self.config.data_file);
        let server = Server::new(listener, store, controller.signal());
        server.serve().await?;
        Ok(())
    }
}

/// Install SIGINT/SIGTERM listeners that trigger the shutdown controller.
///
/// The delivery path only flips the controller's channel; all cleanup
/// happens on the server's normal exit path. Installation failure is a
/// fatal setup error.
#[cfg(unix)]
pub fn install_signal_handlers(controller: &ShutdownController) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    use tracing::info;

    let mut interrupt = signal(SignalKind::interrupt()).map_err(DaemonError::SignalInstall)?;
    let mut terminate = signal(SignalKind::terminate()).map_err(DaemonError::SignalInstall)?;

    let controller = controller.clone();
    tokio::spawn(async move {
        // Keep listening so repeated signals re-trigger instead of being
        // dropped after the first delivery.
        loop {
            let received = tokio::select! {
                s = interrupt.recv() => s,
                s = terminate.recv() => s,
            };
            if received.is_none() {
                break;
            }
            info!("Termination signal received");
            controller.trigger();
        }
    });

    Ok(())
}
