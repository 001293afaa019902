//! QueueKV Server Binary
//!
//! Starts the TCP server for QueueKV.

use std::sync::Arc;

use clap::Parser;
use queuekv::network::Server;
use queuekv::{Config, QueueStore, ServerStats};
use tracing_subscriber::{fmt, EnvFilter};

/// QueueKV Server
#[derive(Parser, Debug)]
#[command(name = "queuekv-server")]
#[command(about = "Queue broker with transactional reads over the memcached protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:22133")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Pause between dequeue attempts while a GET waits (ms)
    #[arg(short, long, default_value = "50")]
    poll_interval_ms: u64,

    /// Per consumer group item limit (0 = unbounded)
    #[arg(long, default_value = "0")]
    max_queue_items: usize,

    /// Drop consumer groups unused for this long (ms, 0 = never)
    #[arg(long, default_value = "600000")]
    group_idle_timeout_ms: u64,

    /// Largest accepted SET payload in KB
    #[arg(long, default_value = "1024")]
    max_value_kb: usize,

    /// Idle read timeout per connection (ms, 0 = none)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,

    /// Reject GETs for queues that were never SET
    #[arg(long)]
    no_auto_create: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,queuekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("QueueKV Server v{}", queuekv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .poll_interval_ms(args.poll_interval_ms)
        .max_queue_items(args.max_queue_items)
        .group_idle_timeout_ms(args.group_idle_timeout_ms)
        .max_value_size(args.max_value_kb * 1024)
        .read_timeout_ms(args.read_timeout_ms)
        .auto_create_queues(!args.no_auto_create)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let store = Arc::new(QueueStore::new(&config));
    let stats = Arc::new(ServerStats::new());

    // Start server
    let mut server = Server::new(config, store, stats);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
