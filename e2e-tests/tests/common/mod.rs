//! Test utilities shared by the end-to-end tests.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use echolog_core::server::bind_listener;
use echolog_core::{LogStore, Server, ServerConfig, ShutdownController};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Run the given future with a timeout, failing the test if it elapses.
pub async fn run_with_timeout<F, T>(duration: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .expect("test timed out")
}

/// A server instance booted for one test.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub controller: ShutdownController,
    pub task: JoinHandle<()>,
}

/// Boot a server on a loopback port (ephemeral if `port` is 0) with the
/// given log-store path.
pub async fn start_server(port: u16, data_file: &Path) -> RunningServer {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        data_file: data_file.to_path_buf(),
        ..ServerConfig::default()
    };

    let std_listener = bind_listener(&config).expect("bind");
    let addr = std_listener.local_addr().expect("local addr");
    let listener = TcpListener::from_std(std_listener).expect("tokio listener");

    let controller = ShutdownController::new();
    let server = Server::new(
        listener,
        LogStore::new(&config.data_file),
        controller.signal(),
    );
    let task = tokio::spawn(async move {
        server.serve().await.expect("serve");
    });

    RunningServer {
        addr,
        controller,
        task,
    }
}

/// Trigger shutdown and wait for the server task to finish.
pub async fn stop_server(server: RunningServer) {
    server.controller.trigger();
    run_with_timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server task");
}

/// Connect, send `payload`, and collect the reply until the server closes
/// the connection.
pub async fn roundtrip(addr: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(payload).await.expect("send");
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.expect("read reply");
    reply
}

/// Whether `haystack` contains `needle` as a contiguous byte run.
pub fn contains_record(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
