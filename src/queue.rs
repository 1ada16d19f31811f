//! Bounded FIFO queue primitive.
//!
//! `BoundedQueue` is the channel type used on both sides of the streaming
//! pipeline: decode jobs flow to the worker pool through one instance, and
//! decoded tiles flow back to the render thread through another. Both ends
//! need to choose per call whether a full/empty queue blocks or fails fast,
//! so the queue exposes blocking, non-blocking, and timed variants of push
//! and pop rather than a single policy.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Returned by [`BoundedQueue::try_push`] when the queue is at capacity.
///
/// Carries the rejected item back to the caller so it can be retried or
/// dropped without cloning.
#[derive(Debug)]
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    /// Recover the item that could not be enqueued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

impl<T: fmt::Debug> std::error::Error for QueueFull<T> {}

/// Fixed-capacity FIFO queue with blocking and non-blocking operations.
///
/// Internally a mutex-guarded ring buffer with two condition variables,
/// one per direction. All methods take `&self`; the queue is meant to be
/// shared across threads behind an `Arc`.
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Append an item, blocking while the queue is full.
    pub fn push(&self, item: T) {
        let mut items = self.items.lock();
        while items.len() == self.capacity {
            self.not_full.wait(&mut items);
        }
        items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Append an item, failing immediately if the queue is full.
    pub fn try_push(&self, item: T) -> Result<(), QueueFull<T>> {
        let mut items = self.items.lock();
        if items.len() == self.capacity {
            return Err(QueueFull(item));
        }
        items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest item, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                self.not_full.notify_one();
                return item;
            }
            self.not_empty.wait(&mut items);
        }
    }

    /// Remove the oldest item, returning `None` immediately if empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut items = self.items.lock();
        let item = items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Remove the oldest item, waiting up to `timeout` for one to arrive.
    ///
    /// Worker loops use this instead of a plain blocking pop so they can
    /// periodically observe a shutdown flag.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut items = self.items.lock();
        if let Some(item) = items.pop_front() {
            self.not_full.notify_one();
            return Some(item);
        }
        let _ = self.not_empty.wait_for(&mut items, timeout);
        let item = items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Maximum number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
