//! Consumer Module
//!
//! The capabilities the GET state machine needs from queue storage.
//!
//! ## Responsibilities
//! - Resolve `(queue, consumer group)` to a consumer handle
//! - Non-blocking dequeue, peek and requeue on that handle
//! - Per-queue and process-wide counters
//!
//! Storage itself lives behind these traits; see `crate::queue` for the
//! bundled in-memory store.

mod stats;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::Result;

pub use stats::{QueueStats, ServerStats};

/// A handle bound to one `(queue, consumer group)` pair
pub trait Consumer: Send + Sync {
    /// Remove and return the head item, if any
    fn dequeue(&self) -> Option<Bytes>;

    /// Return the head item without removing it
    fn peek(&self) -> Option<Bytes>;

    /// Put a previously dequeued item back
    fn requeue(&self, value: Bytes) -> Result<()>;

    /// Counters for the underlying queue
    fn stats(&self) -> &QueueStats;

    /// Park until an item may be available or `deadline` passes
    ///
    /// Spurious returns are fine; the caller retries the dequeue. The default
    /// sleeps for `poll_interval`, never past the deadline.
    fn wait_for_item(&self, deadline: Instant, poll_interval: Duration) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        thread::sleep(remaining.min(poll_interval));
    }
}

/// Maps queue name and consumer group to a consumer handle
pub trait ConsumerResolver: Send + Sync {
    fn resolve(&self, queue: &str, group: &str) -> Result<Arc<dyn Consumer>>;
}

/// Receives process-wide command counts
pub trait StatsSink: Send + Sync {
    /// One top-level GET was served
    fn incr_cmd_get(&self);
}
