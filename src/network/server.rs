//! TCP Server
//!
//! Accepts connections and serves each one on its own thread.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for LedgerKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

/// Stops a running [`Server`] from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Signal the accept loop to stop
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// A connection thread plus a handle to its socket, so shutdown can close it
struct LiveConnection {
    stream: TcpStream,
    thread: JoinHandle<()>,
}

impl Server {
    /// Bind the configured listen address
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        // Polled so the loop can observe shutdown
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Run the accept loop until shutdown is signalled (blocking)
    ///
    /// Every accepted stream gets its own thread, so idle clients never hold
    /// up others. At most `max_connections` are served at once; a stream
    /// arriving past that limit is closed. On shutdown the remaining
    /// connections are closed and their threads joined before returning.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            "Listening on {} (max {} connections)",
            self.local_addr()?,
            self.config.max_connections
        );

        // Connection threads report their id here when they finish
        let (done_tx, done_rx) = channel::unbounded::<u64>();
        let mut live: HashMap<u64, LiveConnection> = HashMap::new();
        let mut next_conn_id: u64 = 0;

        while !self.shutdown.load(Ordering::Acquire) {
            reap_finished(&done_rx, &mut live);

            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if live.len() >= self.config.max_connections {
                        tracing::warn!(
                            "Rejecting connection from {}: {} connections open",
                            peer,
                            live.len()
                        );
                        continue;
                    }

                    next_conn_id += 1;
                    match self.spawn_connection(next_conn_id, stream, done_tx.clone()) {
                        Ok(conn) => {
                            tracing::trace!("Serving connection {} from {}", next_conn_id, peer);
                            live.insert(next_conn_id, conn);
                        }
                        Err(e) => tracing::warn!("Dropping connection from {}: {}", peer, e),
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Shutting down, closing {} connections", live.len());
        close_all(live);
        Ok(())
    }

    fn spawn_connection(
        &self,
        conn_id: u64,
        stream: TcpStream,
        done: Sender<u64>,
    ) -> Result<LiveConnection> {
        stream.set_nonblocking(false)?;
        let handle = stream.try_clone()?;

        let engine = Arc::clone(&self.engine);
        let timeouts = (self.config.read_timeout_ms, self.config.write_timeout_ms);
        let thread = thread::Builder::new()
            .name(format!("ledgerkv-conn-{}", conn_id))
            .spawn(move || {
                serve_connection(conn_id, stream, engine, timeouts);
                // The accept loop may already be gone during shutdown
                let _ = done.send(conn_id);
            })?;

        Ok(LiveConnection {
            stream: handle,
            thread,
        })
    }
}

fn serve_connection(conn_id: u64, stream: TcpStream, engine: Arc<Engine>, timeouts: (u64, u64)) {
    let span = tracing::info_span!("conn", id = conn_id);
    let _enter = span.enter();

    let mut connection = match Connection::new(stream, engine) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Failed to set up connection: {}", e);
            return;
        }
    };

    if let Err(e) = connection.set_timeouts(timeouts.0, timeouts.1) {
        tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
        return;
    }

    if let Err(e) = connection.handle() {
        tracing::error!("Connection {} terminated: {}", connection.peer_addr(), e);
    }
}

fn reap_finished(done: &Receiver<u64>, live: &mut HashMap<u64, LiveConnection>) {
    for conn_id in done.try_iter() {
        if let Some(conn) = live.remove(&conn_id) {
            join_connection(conn.thread);
        }
    }
}

fn close_all(live: HashMap<u64, LiveConnection>) {
    for (_, conn) in live {
        // Unblocks a thread waiting on a read; the peer may already be gone
        let _ = conn.stream.shutdown(Shutdown::Both);
        join_connection(conn.thread);
    }
}

fn join_connection(thread: JoinHandle<()>) {
    if thread.join().is_err() {
        tracing::error!("Connection thread panicked");
    }
}
