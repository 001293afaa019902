//! Queue store
//!
//! Registry of named queues; resolves GET targets to consumer handles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::config::Config;
use crate::consumer::{Consumer, ConsumerResolver};
use crate::error::{BrokerError, Result};
use crate::protocol::CONSUMER_GROUP_SEPARATOR;
use super::{GroupConsumer, Queue};

/// In-memory registry of queues
pub struct QueueStore {
    /// Queue name -> queue (RwLock: lookups vastly outnumber creations)
    queues: RwLock<HashMap<String, Arc<Queue>>>,

    /// Per-group item limit handed to new queues
    max_items: usize,

    /// Create unknown queues when a GET references them
    auto_create: bool,

    /// Handed to new queues for evicting unused consumer groups
    group_idle_timeout: Option<Duration>,
}

impl QueueStore {
    pub fn new(config: &Config) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            max_items: config.max_queue_items,
            auto_create: config.auto_create_queues,
            group_idle_timeout: config.group_idle_timeout(),
        }
    }

    /// Get a queue, creating it if needed
    pub fn get_or_create(&self, name: &str) -> Result<Arc<Queue>> {
        validate_queue_name(name)?;

        if let Some(queue) = self.queues.read().get(name) {
            return Ok(Arc::clone(queue));
        }

        let mut queues = self.queues.write();
        let queue = queues.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!("Creating queue {}", name);
            Arc::new(
                Queue::new(name, self.max_items).with_group_idle_timeout(self.group_idle_timeout),
            )
        });
        Ok(Arc::clone(queue))
    }

    /// Look up an existing queue
    pub fn queue(&self, name: &str) -> Option<Arc<Queue>> {
        self.queues.read().get(name).cloned()
    }

    /// Append a value to a queue (SET)
    pub fn enqueue(&self, name: &str, value: Bytes) -> Result<()> {
        self.get_or_create(name)?.enqueue(value)
    }

    /// Snapshot of all queues, sorted by name
    pub fn queues(&self) -> Vec<Arc<Queue>> {
        let mut queues: Vec<_> = self.queues.read().values().cloned().collect();
        queues.sort_by(|a, b| a.name().cmp(b.name()));
        queues
    }

    pub fn queue_count(&self) -> usize {
        self.queues.read().len()
    }
}

impl ConsumerResolver for QueueStore {
    fn resolve(&self, queue: &str, group: &str) -> Result<Arc<dyn Consumer>> {
        let queue = if self.auto_create {
            self.get_or_create(queue)?
        } else {
            validate_queue_name(queue)?;
            self.queue(queue)
                .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?
        };

        Ok(Arc::new(GroupConsumer::new(queue, group)))
    }
}

/// Queue names must survive a round trip through a GET specifier
fn validate_queue_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.contains('/')
        || name.contains(CONSUMER_GROUP_SEPARATOR)
        || name.chars().any(|c| c.is_whitespace() || c.is_control());

    if invalid {
        return Err(BrokerError::InvalidQueueName(name.to_string()));
    }
    Ok(())
}
