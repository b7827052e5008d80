//! Bounded FIFO queue connecting adjacent pipeline stages.
//!
//! Each queue has exactly one writer-side stage and one reader-side stage
//! (poller → publisher on the edge, subscriber → transformer in the cloud).
//! The queue is bounded; what happens when it fills is an explicit,
//! configured policy rather than unbounded growth under a broker or sink
//! outage.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;

/// What to do when a producer pushes into a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Block the producer until the consumer makes room (backpressure).
    Block,
    /// Evict the oldest queued item to make room, counting the drop.
    DropOldest,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        Self::Block
    }
}

/// Push failed because the queue was closed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("queue closed")]
pub struct QueueClosed;

struct Inner<T> {
    buf: VecDeque<T>,
    closed: bool,
    dropped: u64,
}

/// Bounded single-producer/single-consumer FIFO.
///
/// `pop` waits while the queue is empty and returns `None` once the queue
/// is closed and fully drained, so consumers exit cleanly on shutdown.
pub struct TelemetryQueue<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    policy: OverflowPolicy,
    readable: Notify,
    writable: Notify,
}

impl<T> TelemetryQueue<T> {
    /// Create a queue with the given capacity and overflow policy.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Arc<Self> {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Arc::new(Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(capacity),
                closed: false,
                dropped: 0,
            }),
            capacity,
            policy,
            readable: Notify::new(),
            writable: Notify::new(),
        })
    }

    /// Enqueue an item, honoring the overflow policy.
    ///
    /// With [`OverflowPolicy::Block`] this waits until the consumer makes
    /// room; with [`OverflowPolicy::DropOldest`] it evicts the head and
    /// never waits.
    pub async fn push(&self, item: T) -> Result<(), QueueClosed> {
        loop {
            let notified = self.writable.notified();
            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return Err(QueueClosed);
                }
                if inner.buf.len() < self.capacity {
                    inner.buf.push_back(item);
                    self.readable.notify_one();
                    return Ok(());
                }
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        inner.buf.pop_front();
                        inner.dropped += 1;
                        let dropped = inner.dropped;
                        inner.buf.push_back(item);
                        self.readable.notify_one();
                        tracing::warn!(dropped, "queue full, dropped oldest item");
                        return Ok(());
                    }
                    OverflowPolicy::Block => {}
                }
            }
            notified.await;
        }
    }

    /// Dequeue the next item, waiting while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.readable.notified();
            {
                let mut inner = self.inner.lock();
                if let Some(item) = inner.buf.pop_front() {
                    self.writable.notify_one();
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark the queue complete: pending items remain poppable, further
    /// pushes fail, and blocked readers/writers are woken.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total items evicted under [`OverflowPolicy::DropOldest`].
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fifo_order() {
        let queue = TelemetryQueue::new(4, OverflowPolicy::Block);
        queue.push(1).await.unwrap();
        queue.push(2).await.unwrap();
        queue.push(3).await.unwrap();
        assert_eq!(queue.pop().await, Some(1));
        assert_eq!(queue.pop().await, Some(2));
        assert_eq!(queue.pop().await, Some(3));
    }

    #[tokio::test]
    async fn drop_oldest_evicts_head_and_counts() {
        let queue = TelemetryQueue::new(2, OverflowPolicy::DropOldest);
        queue.push(1).await.unwrap();
        queue.push(2).await.unwrap();
        queue.push(3).await.unwrap();
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.pop().await, Some(2));
        assert_eq!(queue.pop().await, Some(3));
    }

    #[tokio::test]
    async fn close_lets_reader_drain_then_end() {
        let queue = TelemetryQueue::new(4, OverflowPolicy::Block);
        queue.push(1).await.unwrap();
        queue.push(2).await.unwrap();
        queue.close();
        assert_eq!(queue.pop().await, Some(1));
        assert_eq!(queue.pop().await, Some(2));
        assert_eq!(queue.pop().await, None);
        assert_eq!(queue.push(3).await, Err(QueueClosed));
    }

    #[tokio::test]
    async fn blocked_reader_wakes_on_close() {
        let queue: Arc<TelemetryQueue<i32>> = TelemetryQueue::new(4, OverflowPolicy::Block);
        let reader = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();
        assert_eq!(reader.await.unwrap(), None);
    }

    #[tokio::test]
    async fn block_policy_applies_backpressure() {
        let queue = TelemetryQueue::new(1, OverflowPolicy::Block);
        queue.push(1).await.unwrap();

        let mut writer = tokio_test::task::spawn(queue.push(2));
        assert!(writer.poll().is_pending());

        assert_eq!(queue.pop().await, Some(1));
        assert!(writer.is_woken());
        assert_eq!(writer.await, Ok(()));
        assert_eq!(queue.pop().await, Some(2));
    }
}
