//! Queue Module
//!
//! In-memory queue storage behind the consumer traits.
//!
//! ## Responsibilities
//! - Hold pending items per queue and consumer group
//! - Serve concurrent dequeue/requeue from many connections
//! - Wake blocked GETs when items arrive
//!
//! ## Data Structure Choice
//! `HashMap<group, VecDeque<Bytes>>` behind a parking_lot Mutex per queue:
//! - Idle named groups are dropped on enqueue so a stray GET cannot pin items
//! - `Bytes` clones are reference-counted, so fan-out to groups is cheap
//! - One Condvar per queue signalled on every push
//! - Nothing is persisted; items (open or pending) are lost on restart

mod fanout;
mod store;

pub use fanout::{GroupConsumer, Queue, DEFAULT_GROUP};
pub use store::QueueStore;
