//! # QueueKV
//!
//! A queue broker speaking a memcached-style text protocol, with:
//! - Transactional reads (open, then close or abort)
//! - Client-specified GET timeouts that block until an item arrives
//! - Consumer groups, each seeing every enqueued item
//! - Thread-per-connection worker pool
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (Worker pool, one conn each)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ GET tokens
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    GET Handler                               │
//! │     parse ─► dispatch ─► timed dequeue ─► Transaction        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ resolve(queue, group)
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Consumer   │          │    Stats    │
//!   │  (traits)   │          │   (atomic)  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │ QueueStore  │
//!   │ (in-memory) │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod consumer;
pub mod queue;
pub mod get;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BrokerError, Result};
pub use config::Config;
pub use consumer::{Consumer, ConsumerResolver, QueueStats, ServerStats, StatsSink};
pub use get::GetHandler;
pub use queue::QueueStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of QueueKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
