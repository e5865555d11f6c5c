//! Connection worker
//!
//! One worker per accepted connection: receive chunks until a chunk ends
//! with the newline delimiter (or the peer half-closes), append everything
//! verbatim to the log store, then stream the full store contents back.
//! A worker waiting on an idle peer gives up as soon as shutdown is
//! requested; an idle client must never keep the process alive.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use crate::logstore::LogStore;
use crate::server::shutdown::ShutdownSignal;
use crate::{Result, ServerError};

/// Size of the per-connection receive and read-back buffer
pub const CHUNK_SIZE: usize = 1024;

/// Handle one accepted connection end-to-end.
///
/// Worker-local failures are logged here and never propagate to the
/// acceptor loop or to other workers.
pub async fn handle(
    mut stream: TcpStream,
    peer: SocketAddr,
    store: LogStore,
    mut shutdown: ShutdownSignal,
) {
    if let Err(e) = serve_client(&mut stream, &store, &mut shutdown).await {
        error!("Connection {}: {}", peer, e);
    }
    info!("Closed connection from {}", peer);
}

async fn serve_client(
    stream: &mut TcpStream,
    store: &LogStore,
    shutdown: &mut ShutdownSignal,
) -> Result<()> {
    let mut buf = [0u8; CHUNK_SIZE];

    // Receive loop: append each chunk as it arrives. A chunk whose last
    // byte is the delimiter completes the record; EOF persists whatever
    // was received without requiring a delimiter. Shutdown ends the wait
    // the same way EOF does.
    let mut appender = store.open_appender().await.map_err(ServerError::LogStore)?;
    loop {
        let n = tokio::select! {
            received = stream.read(&mut buf) => received?,
            _ = shutdown.triggered() => {
                debug!("Shutdown requested before delimiter");
                break;
            }
        };
        if n == 0 {
            debug!("Peer closed before delimiter");
            break;
        }
        appender
            .append(&buf[..n])
            .await
            .map_err(ServerError::LogStore)?;
        if buf[n - 1] == b'\n' {
            break;
        }
    }
    drop(appender);

    // Read-back: send the entire accumulated store, in file order.
    let mut reader = store.open_reader().await.map_err(ServerError::LogStore)?;
    loop {
        let n = reader.read(&mut buf).await.map_err(ServerError::LogStore)?;
        if n == 0 {
            break;
        }
        stream.write_all(&buf[..n]).await?;
    }
    stream.flush().await?;
    Ok(())
}
