//! Connection-level integration tests for the server core.
//!
//! Each test boots a server on an ephemeral loopback port with a
//! temporary log store and talks to it over a real TCP socket.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use echolog_core::server::bind_listener;
use echolog_core::{LogStore, Server, ServerConfig, ShutdownController};

struct TestServer {
    addr: SocketAddr,
    controller: ShutdownController,
    task: JoinHandle<()>,
    store: LogStore,
}

async fn start_server(data_file: &Path) -> TestServer {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_file: data_file.to_path_buf(),
        ..ServerConfig::default()
    };

    let std_listener = bind_listener(&config).expect("bind");
    let addr = std_listener.local_addr().expect("local addr");
    let listener = TcpListener::from_std(std_listener).expect("tokio listener");

    let store = LogStore::new(&config.data_file);
    let controller = ShutdownController::new();
    let server = Server::new(listener, store.clone(), controller.signal());
    let task = tokio::spawn(async move {
        server.serve().await.expect("serve");
    });

    TestServer {
        addr,
        controller,
        task,
        store,
    }
}

async fn send_and_collect(addr: SocketAddr, payload: &[u8], half_close: bool) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(payload).await.expect("send");
    if half_close {
        stream.shutdown().await.expect("half close");
    }
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.expect("read reply");
    reply
}

async fn stop(server: TestServer) {
    server.controller.trigger();
    tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server stopped")
        .expect("server task");
}

#[tokio::test]
async fn delimited_record_is_echoed_in_full() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(&dir.path().join("data")).await;

    let reply = send_and_collect(server.addr, b"hello socket\n", false).await;
    assert_eq!(reply, b"hello socket\n");

    stop(server).await;
}

#[tokio::test]
async fn undelimited_record_is_persisted_on_eof() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(&dir.path().join("data")).await;

    // No trailing newline; the half-close signals end-of-stream. The
    // bytes must still be flushed to the store and echoed back.
    let reply = send_and_collect(server.addr, b"no delimiter here", true).await;
    assert_eq!(reply, b"no delimiter here");
    assert_eq!(
        server.store.read_to_vec().await.expect("read store"),
        b"no delimiter here"
    );

    stop(server).await;
}

#[tokio::test]
async fn record_larger_than_one_chunk_is_not_truncated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(&dir.path().join("data")).await;

    let mut record = vec![b'x'; 5000];
    record.push(b'\n');
    let reply = send_and_collect(server.addr, &record, false).await;
    assert_eq!(reply, record);

    stop(server).await;
}

#[tokio::test]
async fn replies_accumulate_across_connections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(&dir.path().join("data")).await;

    let first = send_and_collect(server.addr, b"first\n", false).await;
    assert_eq!(first, b"first\n");

    let second = send_and_collect(server.addr, b"second\n", false).await;
    assert_eq!(second, b"first\nsecond\n");

    stop(server).await;
}

#[tokio::test]
async fn shutdown_completes_while_idle_client_is_connected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(&dir.path().join("data")).await;

    // The client stalls mid-record: no delimiter, no close. The worker is
    // parked in its socket read when the termination signal arrives; the
    // server must still drain and exit instead of waiting on the peer.
    let mut stream = TcpStream::connect(server.addr).await.expect("connect");
    stream
        .write_all(b"partial record without delimiter")
        .await
        .expect("send");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let store_path = server.store.path().to_path_buf();
    stop(server).await;

    assert!(!store_path.exists(), "log store must be deleted on shutdown");
    drop(stream);
}

#[tokio::test]
async fn shutdown_deletes_store_and_closes_listener() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = start_server(&dir.path().join("data")).await;
    let addr = server.addr;

    let reply = send_and_collect(addr, b"going away\n", false).await;
    assert_eq!(reply, b"going away\n");

    let store_path = server.store.path().to_path_buf();
    assert!(store_path.exists());

    stop(server).await;

    assert!(!store_path.exists(), "log store must be deleted on shutdown");
    assert!(
        TcpStream::connect(addr).await.is_err(),
        "listener must be closed after shutdown"
    );
}
