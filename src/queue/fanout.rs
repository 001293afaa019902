//! Queue implementation
//!
//! One FIFO per consumer group behind a single mutex, with a condition
//! variable signalled on every push.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::consumer::{Consumer, QueueStats};
use crate::error::{BrokerError, Result};

/// Name of the group used when a GET names none
pub const DEFAULT_GROUP: &str = "";

/// Pending items of one consumer group
#[derive(Debug)]
struct Group {
    items: VecDeque<Bytes>,

    /// Last time a consumer read, requeued or waited on this group
    last_used: Instant,

    /// Consumers currently blocked in `wait_until`
    waiters: usize,
}

impl Group {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
            last_used: Instant::now(),
            waiters: 0,
        }
    }

    fn touch(&mut self) {
        self.last_used = Instant::now();
    }
}

/// A named queue fanned out to its consumer groups
#[derive(Debug)]
pub struct Queue {
    name: String,

    /// Per-group item limit (0 = unbounded)
    max_items: usize,

    /// Named groups unused for this long are dropped (None = never)
    group_idle_timeout: Option<Duration>,

    /// Group name -> pending items, head at the front
    groups: Mutex<HashMap<String, Group>>,

    /// Signalled whenever an item is pushed onto any group
    available: Condvar,

    stats: QueueStats,
}

impl Queue {
    pub fn new(name: impl Into<String>, max_items: usize) -> Self {
        let mut groups = HashMap::new();
        groups.insert(DEFAULT_GROUP.to_string(), Group::new());

        Self {
            name: name.into(),
            max_items,
            group_idle_timeout: None,
            groups: Mutex::new(groups),
            available: Condvar::new(),
            stats: QueueStats::new(),
        }
    }

    /// Drop named groups that no consumer has used for `timeout`
    pub fn with_group_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.group_idle_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Append an item to every consumer group with room for it
    ///
    /// A group at its limit misses the item; the others still receive it.
    /// Fails with `QueueFull` only when no group could take it.
    pub fn enqueue(&self, value: Bytes) -> Result<()> {
        let mut groups = self.groups.lock();
        self.evict_idle(&mut groups);

        let mut accepted = 0;
        for (group, entry) in groups.iter_mut() {
            if self.max_items > 0 && entry.items.len() >= self.max_items {
                tracing::warn!("{}: group {:?} is full, skipping item", self.name, group);
                continue;
            }
            entry.items.push_back(value.clone());
            accepted += 1;
        }
        drop(groups);

        if accepted == 0 {
            return Err(BrokerError::QueueFull(self.name.clone()));
        }

        self.stats.record_enqueue();
        self.available.notify_all();
        Ok(())
    }

    /// Register a consumer group if it does not exist yet
    ///
    /// A new group starts empty and sees only items enqueued after it.
    pub fn ensure_group(&self, group: &str) {
        self.groups
            .lock()
            .entry(group.to_string())
            .or_insert_with(Group::new)
            .touch();
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.lock().contains_key(group)
    }

    /// Pending items for a group
    pub fn len(&self, group: &str) -> usize {
        self.groups.lock().get(group).map(|g| g.items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, group: &str) -> bool {
        self.len(group) == 0
    }

    /// Remove idle named groups; the default group and groups with a
    /// blocked consumer always stay
    fn evict_idle(&self, groups: &mut HashMap<String, Group>) {
        let Some(timeout) = self.group_idle_timeout else {
            return;
        };

        groups.retain(|group, entry| {
            let keep = group == DEFAULT_GROUP
                || entry.waiters > 0
                || entry.last_used.elapsed() < timeout;
            if !keep {
                tracing::debug!(
                    "{}: dropping idle group {:?} ({} pending items)",
                    self.name,
                    group,
                    entry.items.len()
                );
            }
            keep
        });
    }

    fn pop(&self, group: &str) -> Option<Bytes> {
        let value = {
            let mut groups = self.groups.lock();
            let entry = groups.get_mut(group)?;
            entry.touch();
            entry.items.pop_front()
        };
        if value.is_some() {
            self.stats.record_dequeue();
        }
        value
    }

    fn front(&self, group: &str) -> Option<Bytes> {
        self.groups.lock().get(group)?.items.front().cloned()
    }

    /// Return an item to the head of a group so it is delivered next
    fn push_front(&self, group: &str, value: Bytes) -> Result<()> {
        let mut groups = self.groups.lock();
        let entry = groups.entry(group.to_string()).or_insert_with(Group::new);

        if self.max_items > 0 && entry.items.len() >= self.max_items {
            return Err(BrokerError::QueueFull(self.name.clone()));
        }
        entry.touch();
        entry.items.push_front(value);
        drop(groups);

        self.stats.record_requeue();
        self.available.notify_all();
        Ok(())
    }

    /// Block until the group has an item or the deadline passes
    fn wait_until(&self, group: &str, deadline: Instant) {
        let mut groups = self.groups.lock();
        let entry = groups.entry(group.to_string()).or_insert_with(Group::new);
        entry.touch();
        if !entry.items.is_empty() {
            return;
        }
        entry.waiters += 1;

        self.available.wait_until(&mut groups, deadline);

        if let Some(entry) = groups.get_mut(group) {
            entry.waiters = entry.waiters.saturating_sub(1);
            entry.touch();
        }
    }
}

/// A consumer handle bound to one group of a queue
#[derive(Debug, Clone)]
pub struct GroupConsumer {
    queue: Arc<Queue>,
    group: String,
}

impl GroupConsumer {
    pub fn new(queue: Arc<Queue>, group: impl Into<String>) -> Self {
        let group = group.into();
        queue.ensure_group(&group);
        Self { queue, group }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }
}

impl Consumer for GroupConsumer {
    fn dequeue(&self) -> Option<Bytes> {
        self.queue.pop(&self.group)
    }

    fn peek(&self) -> Option<Bytes> {
        self.queue.front(&self.group)
    }

    fn requeue(&self, value: Bytes) -> Result<()> {
        self.queue.push_front(&self.group, value)
    }

    fn stats(&self) -> &QueueStats {
        self.queue.stats()
    }

    /// Timed wait on the queue's push signal; no polling
    fn wait_for_item(&self, deadline: Instant, _poll_interval: Duration) {
        self.queue.wait_until(&self.group, deadline);
    }
}
