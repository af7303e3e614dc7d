//! Tests for the TCP server
//!
//! These tests verify:
//! - End-to-end SET/GET over a socket
//! - Negative replies keep the connection open
//! - Malformed framing closes the connection
//! - Several clients served concurrently, idle ones never blocking others
//! - Connections past the limit are closed
//! - Shutdown stops the accept loop and closes open connections

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ledgerkv::network::{Server, ShutdownHandle};
use ledgerkv::protocol::{encode_request, read_reply, Reply};
use ledgerkv::{Config, Engine};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    _temp: TempDir,
    engine: Arc<Engine>,
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(64)
    }

    fn start_with(max_connections: usize) -> Self {
        let temp = TempDir::new().unwrap();
        let config = Config::builder()
            .data_path(temp.path().join("server.db"))
            .listen_addr("127.0.0.1:0")
            .max_connections(max_connections)
            .read_timeout_ms(5000)
            .build();

        let engine = Arc::new(Engine::open(&config.data_path).unwrap());
        let server = Server::bind(config, Arc::clone(&engine)).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run().unwrap());

        Self {
            _temp: temp,
            engine,
            addr,
            shutdown,
            handle: Some(handle),
        }
    }

    fn connect(&self) -> Client {
        let stream = TcpStream::connect(self.addr).unwrap();
        // Fail instead of hanging if the server never answers
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        Client {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: stream,
        }
    }

    fn stop(mut self) {
        self.shutdown.shutdown();
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn send(&mut self, args: &[&[u8]]) -> Reply {
        self.writer.write_all(&encode_request(args)).unwrap();
        read_reply(&mut self.reader).unwrap()
    }

    fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).unwrap();
    }
}

// =============================================================================
// Request / Reply Tests
// =============================================================================

#[test]
fn test_set_then_get() {
    let server = TestServer::start();
    let mut client = server.connect();

    assert_eq!(client.send(&[b"SET", b"key1", b"value1"]), Reply::Ok);
    assert_eq!(
        client.send(&[b"GET", b"key1"]),
        Reply::Value(b"value1".to_vec())
    );
    assert_eq!(server.engine.get(b"key1").unwrap(), b"value1");

    drop(client);
    server.stop();
}

#[test]
fn test_negative_replies_keep_connection() {
    let server = TestServer::start();
    let mut client = server.connect();

    assert_eq!(
        client.send(&[b"GET", b"missing"]),
        Reply::Error("Key not found".to_string())
    );
    assert_eq!(
        client.send(&[b"PING"]),
        Reply::Error("unsupport command 'PING'".to_string())
    );
    assert_eq!(
        client.send(&[b"SET", b"only-key"]),
        Reply::Error("Missing arguments".to_string())
    );
    assert_eq!(client.send(&[b"set", b"k", b"v"]), Reply::Ok);

    drop(client);
    server.stop();
}

#[test]
fn test_raw_reply_bytes() {
    let server = TestServer::start();
    let mut client = server.connect();

    client.send_raw(b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\nb\r\n");
    let mut line = String::new();
    client.reader.read_line(&mut line).unwrap();

    assert_eq!(line, "+OK\r\n");

    drop(client);
    server.stop();
}

#[test]
fn test_malformed_request_closes_connection() {
    let server = TestServer::start();
    let mut client = server.connect();

    client.send_raw(b"GET key\r\n");
    let mut rest = Vec::new();
    let read = client.reader.read_to_end(&mut rest).unwrap_or(0);

    assert_eq!(read, 0);

    // Server keeps serving other clients
    let mut other = server.connect();
    assert_eq!(other.send(&[b"SET", b"k", b"v"]), Reply::Ok);

    drop(other);
    server.stop();
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_clients() {
    let server = TestServer::start();
    let addr = server.addr;

    let handles: Vec<_> = (0..4)
        .map(|t| {
            thread::spawn(move || {
                let stream = TcpStream::connect(addr).unwrap();
                let mut client = Client {
                    reader: BufReader::new(stream.try_clone().unwrap()),
                    writer: stream,
                };
                for i in 0..25 {
                    let key = format!("c{}-{}", t, i);
                    let value = format!("v{}-{}", t, i);
                    assert_eq!(client.send(&[b"SET", key.as_bytes(), value.as_bytes()]), Reply::Ok);
                    assert_eq!(
                        client.send(&[b"GET", key.as_bytes()]),
                        Reply::Value(value.into_bytes())
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(server.engine.len(), 100);
    server.stop();
}

#[test]
fn test_idle_clients_do_not_block_new_ones() {
    let server = TestServer::start();

    let idle: Vec<_> = (0..20).map(|_| server.connect()).collect();

    let mut client = server.connect();
    assert_eq!(client.send(&[b"SET", b"k", b"v"]), Reply::Ok);
    assert_eq!(client.send(&[b"GET", b"k"]), Reply::Value(b"v".to_vec()));

    drop(client);
    drop(idle);
    server.stop();
}

#[test]
fn test_connection_over_limit_is_closed() {
    let server = TestServer::start_with(2);

    let mut first = server.connect();
    let mut second = server.connect();
    assert_eq!(first.send(&[b"SET", b"a", b"1"]), Reply::Ok);
    assert_eq!(second.send(&[b"SET", b"b", b"2"]), Reply::Ok);

    let mut third = server.connect();
    let mut rest = Vec::new();
    let read = third.reader.read_to_end(&mut rest).unwrap_or(0);
    assert_eq!(read, 0);

    // A slot frees up once a client leaves
    drop(first);
    thread::sleep(Duration::from_millis(200));
    let mut fourth = server.connect();
    assert_eq!(fourth.send(&[b"GET", b"b"]), Reply::Value(b"2".to_vec()));

    drop(second);
    drop(fourth);
    server.stop();
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_shutdown_closes_open_connections() {
    let server = TestServer::start();

    let mut idle = server.connect();
    assert_eq!(idle.send(&[b"SET", b"k", b"v"]), Reply::Ok);

    // Returns even though the client never disconnects
    server.stop();

    let mut rest = Vec::new();
    let read = idle.reader.read_to_end(&mut rest).unwrap_or(0);
    assert_eq!(read, 0);
}
