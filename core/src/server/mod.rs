//! TCP server: endpoint setup, acceptor loop, worker supervision
//!
//! The acceptor is a single sequential loop that only blocks on `accept`,
//! the shutdown signal and the worker set. Each accepted connection is
//! handed off to its own task with exclusive ownership of the stream;
//! finished workers are collected from the `JoinSet` instead of relying on
//! an OS-level reap signal.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::logstore::LogStore;
use crate::{Result, ServerError};

pub mod connection;
pub mod shutdown;

use shutdown::ShutdownSignal;

/// How long shutdown waits for in-flight workers before aborting them
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve, bind and listen on the configured IPv4 address.
///
/// Tries every resolved IPv4 candidate in order with `SO_REUSEADDR` set
/// and the configured backlog, mirroring the usual resolve-and-bind loop.
/// Returns a non-blocking std listener so binding can happen before the
/// async runtime (and before daemonization) is set up.
pub fn bind_listener(config: &ServerConfig) -> Result<std::net::TcpListener> {
    let addr_str = config.bind_addr();
    let candidates: Vec<SocketAddr> = addr_str
        .to_socket_addrs()
        .map_err(|e| ServerError::Bind {
            addr: addr_str.clone(),
            source: e,
        })?
        .filter(SocketAddr::is_ipv4)
        .collect();

    if candidates.is_empty() {
        return Err(ServerError::Bind {
            addr: addr_str,
            source: std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "no IPv4 address candidates",
            ),
        });
    }

    // Per-candidate failures go into the returned error rather than the
    // log; binding happens before any subscriber is installed.
    let backlog = i32::try_from(config.backlog).unwrap_or(i32::MAX);
    let mut failures = Vec::new();
    for addr in candidates {
        let attempt = (|| {
            let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
            socket.set_reuse_address(true)?;
            socket.bind(&addr.into())?;
            socket.listen(backlog)?;
            socket.set_nonblocking(true)?;
            Ok::<std::net::TcpListener, std::io::Error>(socket.into())
        })();
        match attempt {
            Ok(listener) => return Ok(listener),
            Err(e) => failures.push(format!("{}: {}", addr, e)),
        }
    }

    Err(ServerError::Bind {
        addr: addr_str,
        source: std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, failures.join("; ")),
    })
}

/// The echolog TCP server
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    store: LogStore,
    shutdown: ShutdownSignal,
}

impl Server {
    /// Create a server from a ready listener, a log store handle and a
    /// shutdown signal.
    pub fn new(listener: TcpListener, store: LogStore, shutdown: ShutdownSignal) -> Self {
        Self {
            listener,
            store,
            shutdown,
        }
    }

    /// Local address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(ServerError::Io)
    }

    /// Accept connections until shutdown is requested, then clean up.
    ///
    /// Cleanup order: close the listener, drain in-flight workers, delete
    /// the log store. Draining before deletion means no worker can race
    /// its read-back against the file removal. Every worker observes the
    /// shutdown signal, so a worker waiting on an idle peer finishes
    /// promptly; the drain is still bounded by [`WORKER_DRAIN_TIMEOUT`]
    /// and aborts whatever remains past it.
    pub async fn serve(self) -> Result<()> {
        let Server {
            listener,
            store,
            mut shutdown,
        } = self;

        let local = listener.local_addr()?;
        info!("Listening on {}, waiting for connections", local);

        let mut workers: JoinSet<()> = JoinSet::new();
        let worker_signal = shutdown.clone();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!("Accepted connection from {}", peer);
                            let store = store.clone();
                            workers.spawn(connection::handle(stream, peer, store, worker_signal.clone()));
                        }
                        Err(e) => {
                            if shutdown.is_triggered() {
                                break;
                            }
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                Some(finished) = workers.join_next(), if !workers.is_empty() => {
                    // Worker-local errors are logged inside the task; only
                    // panics surface here.
                    if let Err(e) = finished {
                        error!("Connection worker failed: {}", e);
                    }
                }
                _ = shutdown.triggered() => {
                    info!("Caught signal, exiting");
                    break;
                }
            }
        }

        // Stop accepting before draining.
        drop(listener);

        let drained = tokio::time::timeout(WORKER_DRAIN_TIMEOUT, async {
            while let Some(finished) = workers.join_next().await {
                if let Err(e) = finished {
                    error!("Connection worker failed: {}", e);
                }
            }
        })
        .await;
        if drained.is_err() {
            error!(
                "{} workers still running after {:?}, aborting them",
                workers.len(),
                WORKER_DRAIN_TIMEOUT
            );
            workers.abort_all();
            while workers.join_next().await.is_some() {}
        }

        match store.remove().await {
            Ok(()) => info!("Deleted log store {}", store.path().display()),
            Err(e) => error!(
                "Failed to delete log store {}: {}",
                store.path().display(),
                e
            ),
        }

        info!("Server shut down");
        Ok(())
    }
}
