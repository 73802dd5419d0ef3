//! Fixed-capacity FIFO queue with drop-on-full semantics.

use std::collections::VecDeque;
use std::fmt::Debug;

use parking_lot::Mutex;
use tracing::warn;

/// A bounded FIFO shared between one or more producers and a single consumer.
///
/// Neither side ever blocks: `enqueue` discards the new item when the queue is
/// full and `dequeue` returns `None` immediately when it is empty. The lock is
/// held only while the buffer itself is mutated.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    name: &'static str,
    capacity: usize,
    items: Mutex<VecDeque<T>>,
}

impl<T: Debug> BoundedQueue<T> {
    /// Create an empty queue holding at most `capacity` items.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append `item` unless the queue is full.
    ///
    /// Returns `false` when the item was dropped. Overflow is logged, never
    /// raised as an error.
    pub fn enqueue(&self, item: T) -> bool {
        let rejected = {
            let mut items = self.items.lock();
            if items.len() < self.capacity {
                items.push_back(item);
                None
            } else {
                Some(item)
            }
        };

        match rejected {
            None => true,
            Some(item) => {
                warn!(queue = self.name, capacity = self.capacity, ?item, "Queue is full, discarding item");
                false
            }
        }
    }

    /// Remove and return the oldest item, if any.
    pub fn dequeue(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Maximum number of items the queue retains.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue name used in log output.
    pub fn name(&self) -> &'static str {
        self.name
    }
}
