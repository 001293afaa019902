//! Timed dequeue
//!
//! Attempt a dequeue; if nothing is there, park on the consumer until an
//! item may have arrived or the deadline passes, then try again.

use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::consumer::Consumer;

/// Used when `now + timeout` does not fit in an Instant
const MAX_WAIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Dequeue a non-empty item, waiting up to `timeout` for one to arrive
///
/// A zero timeout makes exactly one attempt and never parks.
pub fn dequeue_with_timeout(
    consumer: &dyn Consumer,
    timeout: Duration,
    poll_interval: Duration,
) -> Option<Bytes> {
    let now = Instant::now();
    let deadline = now
        .checked_add(timeout)
        .unwrap_or_else(|| now + MAX_WAIT);

    loop {
        if let Some(value) = consumer.dequeue().filter(|v| !v.is_empty()) {
            return Some(value);
        }

        if Instant::now() >= deadline {
            return None;
        }

        consumer.wait_for_item(deadline, poll_interval);
    }
}
