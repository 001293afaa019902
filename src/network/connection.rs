//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::config::Config;
use crate::consumer::{ConsumerResolver, ServerStats, StatsSink};
use crate::error::{BrokerError, Result};
use crate::get::GetHandler;
use crate::protocol::{
    read_request, write_end, write_error, write_stat, write_stored, write_version, Request,
};
use crate::queue::{QueueStore, DEFAULT_GROUP};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// GET state machine, owns this connection's open read
    get: GetHandler,

    /// Shared queue registry (SET and STATS)
    store: Arc<QueueStore>,

    /// Process-wide counters
    stats: Arc<ServerStats>,

    /// Largest accepted SET payload
    max_value_size: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and the connection's GET state
    pub fn new(
        stream: TcpStream,
        store: Arc<QueueStore>,
        stats: Arc<ServerStats>,
        config: &Config,
    ) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        let resolver: Arc<dyn ConsumerResolver> = store.clone();
        let sink: Arc<dyn StatsSink> = stats.clone();
        let get = GetHandler::new(resolver, sink).with_poll_interval(config.poll_interval());

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            get,
            store,
            stats,
            max_value_size: config.max_value_size,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends replies. Returns when the client
    /// disconnects or an error occurs. An item still held open at that point
    /// is abandoned.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let result = self.serve();

        if let Some(read) = self.get.abandon() {
            tracing::warn!(
                "Client {} left with an open read on {}; {} bytes abandoned",
                self.peer_addr,
                read.command.queue_name,
                read.value.len()
            );
        }

        result
    }

    fn serve(&mut self) -> Result<()> {
        loop {
            // Read next request
            let request = match read_request(&mut self.reader, self.max_value_size) {
                Ok(req) => req,
                Err(BrokerError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    // Send error reply if possible
                    let _ = self.send_error(&e);
                    return Err(e);
                }
            };

            tracing::trace!("Received request from {}: {:?}", self.peer_addr, request);

            if request == Request::Quit {
                tracing::debug!("Client {} quit", self.peer_addr);
                return Ok(());
            }

            // Execute and send reply
            let result = self
                .execute(request)
                .and_then(|()| self.writer.flush().map_err(BrokerError::from));
            if let Err(e) = result {
                if let BrokerError::Io(ref io_err) = e {
                    // If the client disconnected before we could send the reply,
                    // log and exit gracefully rather than treating it as a server error.
                    if is_disconnect(io_err.kind()) || io_err.kind() == std::io::ErrorKind::BrokenPipe {
                        tracing::debug!(
                            "Client {} disconnected before reply could be sent: {}",
                            self.peer_addr, e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a request, writing its reply
    ///
    /// Command errors are framed onto the wire here; only I/O errors escape.
    fn execute(&mut self, request: Request) -> Result<()> {
        let outcome = match request {
            Request::Get(tokens) => self.get.handle_get(tokens.as_slice(), &mut self.writer),
            Request::Set { queue, data } => self.set(&queue, data),
            Request::Stats => self.write_stats(),
            Request::Version => write_version(&mut self.writer, crate::VERSION),
            Request::Quit => Ok(()),
            Request::Unknown(verb) => {
                tracing::debug!("Unknown command from {}: {:?}", self.peer_addr, verb);
                Err(BrokerError::InvalidCommand)
            }
        };

        match outcome {
            Err(BrokerError::Io(e)) => Err(BrokerError::Io(e)),
            Err(e) => self.send_error(&e),
            Ok(()) => Ok(()),
        }
    }

    fn set(&mut self, queue: &str, data: Vec<u8>) -> Result<()> {
        self.store.enqueue(queue, Bytes::from(data))?;
        self.stats.incr_cmd_set();
        write_stored(&mut self.writer)
    }

    fn write_stats(&mut self) -> Result<()> {
        let w = &mut self.writer;
        write_stat(w, "uptime", self.stats.uptime_secs())?;
        write_stat(w, "version", crate::VERSION)?;
        write_stat(w, "curr_connections", self.stats.curr_connections())?;
        write_stat(w, "total_connections", self.stats.total_connections())?;
        write_stat(w, "cmd_get", self.stats.cmd_get())?;
        write_stat(w, "cmd_set", self.stats.cmd_set())?;

        for queue in self.store.queues() {
            let name = queue.name();
            write_stat(w, &format!("queue_{}_items", name), queue.len(DEFAULT_GROUP))?;
            write_stat(w, &format!("queue_{}_open_reads", name), queue.stats().open_reads())?;
            write_stat(w, &format!("queue_{}_total_items", name), queue.stats().items_enqueued())?;
        }

        write_end(w)
    }

    /// Send an error reply
    fn send_error(&mut self, err: &BrokerError) -> Result<()> {
        write_error(&mut self.writer, err)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Error kinds that mean the client went away (or idled past the read timeout)
fn is_disconnect(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind;

    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
