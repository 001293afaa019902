//! Statistics counters
//!
//! Lock-free counters shared across connections.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use super::StatsSink;

/// Per-queue counters, shared by every handle on the queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Reads currently held open by connections
    open_reads: AtomicI64,

    /// Items ever pushed onto the queue (SET)
    items_enqueued: AtomicU64,

    /// Items ever handed out by a dequeue
    items_dequeued: AtomicU64,

    /// Items returned by abort
    items_requeued: AtomicU64,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the open-read count by `delta` (+1 on open, -1 on close/abort)
    pub fn update_open_reads(&self, delta: i64) {
        self.open_reads.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn open_reads(&self) -> i64 {
        self.open_reads.load(Ordering::Relaxed)
    }

    pub fn record_enqueue(&self) {
        self.items_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dequeue(&self) {
        self.items_dequeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_requeue(&self) {
        self.items_requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn items_enqueued(&self) -> u64 {
        self.items_enqueued.load(Ordering::Relaxed)
    }

    pub fn items_dequeued(&self) -> u64 {
        self.items_dequeued.load(Ordering::Relaxed)
    }

    pub fn items_requeued(&self) -> u64 {
        self.items_requeued.load(Ordering::Relaxed)
    }
}

/// Process-wide counters
#[derive(Debug)]
pub struct ServerStats {
    started_at: Instant,
    cmd_get: AtomicU64,
    cmd_set: AtomicU64,
    curr_connections: AtomicU64,
    total_connections: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            cmd_get: AtomicU64::new(0),
            cmd_set: AtomicU64::new(0),
            curr_connections: AtomicU64::new(0),
            total_connections: AtomicU64::new(0),
        }
    }

    pub fn cmd_get(&self) -> u64 {
        self.cmd_get.load(Ordering::Relaxed)
    }

    pub fn incr_cmd_set(&self) {
        self.cmd_set.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cmd_set(&self) -> u64 {
        self.cmd_set.load(Ordering::Relaxed)
    }

    pub fn connection_opened(&self) {
        self.curr_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.curr_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn curr_connections(&self) -> u64 {
        self.curr_connections.load(Ordering::Relaxed)
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    /// Seconds since the stats were created
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSink for ServerStats {
    fn incr_cmd_get(&self) {
        self.cmd_get.fetch_add(1, Ordering::Relaxed);
    }
}
