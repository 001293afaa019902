//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::{ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError};

use crate::config::Config;
use crate::consumer::ServerStats;
use crate::error::{BrokerError, Result};
use crate::queue::QueueStore;
use super::Connection;

/// Pause between accept attempts while no client is waiting
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// How long an accepted connection may wait for a free worker
const HANDOFF_TIMEOUT: Duration = Duration::from_secs(1);

/// TCP server for QueueKV
pub struct Server {
    config: Config,
    store: Arc<QueueStore>,
    stats: Arc<ServerStats>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
}

/// Stops a running server from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl Server {
    /// Create a new server with the given config, store and stats
    pub fn new(config: Config, store: Arc<QueueStore>, stats: Arc<ServerStats>) -> Self {
        Self {
            config,
            store,
            stats,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the listen address (idempotent); returns the bound address
    pub fn bind(&mut self) -> Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let listener = TcpListener::bind(&self.config.listen_addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        tracing::info!("Listening on {}", addr);

        self.listener = Some(listener);
        Ok(addr)
    }

    /// Bound address, once `bind` or `run` has been called
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Start the server (blocking until shutdown)
    ///
    /// Workers are spawned on demand up to `max_connections`; each serves one
    /// connection at a time. Connections still open at shutdown are served
    /// to completion by their workers.
    pub fn run(&mut self) -> Result<()> {
        self.config.validate()?;
        self.bind()?;

        let listener = self
            .listener
            .take()
            .ok_or_else(|| BrokerError::Config("listener not bound".to_string()))?;

        let (tx, rx) = channel::bounded::<TcpStream>(0);
        let idle = Arc::new(AtomicUsize::new(0));
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        while !self.shutdown.load(Ordering::Relaxed) {
            let (stream, addr) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_BACKOFF);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    continue;
                }
            };

            if let Err(e) = stream.set_nonblocking(false) {
                tracing::warn!("Dropping {}: {}", addr, e);
                continue;
            }

            workers.retain(|w| !w.is_finished());
            if idle.load(Ordering::Acquire) == 0 && workers.len() < self.config.max_connections {
                workers.push(self.spawn_worker(workers.len(), rx.clone(), Arc::clone(&idle))?);
            }

            match tx.send_timeout(stream, HANDOFF_TIMEOUT) {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(mut stream)) => {
                    tracing::warn!("Rejecting {}: all {} workers busy", addr, workers.len());
                    let _ = stream.write_all(b"SERVER_ERROR too many connections\r\n");
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(BrokerError::Config("worker pool is gone".to_string()));
                }
            }
        }

        tracing::info!("Server stopped accepting connections");
        self.listener = Some(listener);
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    fn spawn_worker(
        &self,
        id: usize,
        rx: Receiver<TcpStream>,
        idle: Arc<AtomicUsize>,
    ) -> Result<JoinHandle<()>> {
        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name(format!("queuekv-worker-{}", id))
            .spawn(move || {
                idle.fetch_add(1, Ordering::AcqRel);
                for stream in rx.iter() {
                    idle.fetch_sub(1, Ordering::AcqRel);
                    serve_stream(stream, &store, &stats, &config);
                    idle.fetch_add(1, Ordering::AcqRel);
                }
                idle.fetch_sub(1, Ordering::AcqRel);
            })?;

        Ok(handle)
    }
}

/// Run one connection to completion on the current thread
fn serve_stream(stream: TcpStream, store: &Arc<QueueStore>, stats: &Arc<ServerStats>, config: &Config) {
    stats.connection_opened();

    let result = Connection::new(stream, Arc::clone(store), Arc::clone(stats), config).and_then(|mut conn| {
        conn.set_timeouts(config.read_timeout_ms, config.write_timeout_ms)?;
        conn.handle()
    });
    if let Err(e) = result {
        tracing::debug!("Connection ended with error: {}", e);
    }

    stats.connection_closed();
}
