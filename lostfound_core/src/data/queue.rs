//! Fixed-capacity circular queue of pending work items.
//!
//! # Invariants
//! - `front < capacity` and `rear < capacity`.
//! - `front == rear` iff the queue is empty; `(rear + 1) % capacity == front`
//!   iff it is full. One slot is always left free to tell the two apart, so a
//!   queue with `capacity` slots holds at most `capacity - 1` entries.
//! - Slots in the logical range `[front, rear)` (wrapping) are `Some`; every
//!   other slot is `None`.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use thiserror::Error;
use tracing::debug;

use super::record::{PendingEntry, ReportId};
use crate::digest::{DigestOutput, Digestible};

/// Slot count of a queue built with `PendingQueue::new`.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue is full, {} of {capacity} slots are usable", .capacity - 1)]
    Capacity { capacity: usize },
    #[error("queue is empty")]
    Empty,
    #[error("no pending entry with report id {0}")]
    NotFound(ReportId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQueue {
    slots: Vec<Option<PendingEntry>>,
    front: usize,
    rear: usize,
}

impl PendingQueue {
    pub fn new() -> Self {
        PendingQueue::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates an empty queue with `capacity` slots. Capacities below 2 are
    /// raised to 2, the smallest queue that can hold an entry.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        PendingQueue { slots: vec![None; capacity], front: 0, rear: 0 }
    }

    /// Total slot count, including the one that is always kept free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The most entries the queue can hold at once.
    pub fn usable_capacity(&self) -> usize {
        self.capacity() - 1
    }

    pub fn len(&self) -> usize {
        (self.rear + self.capacity() - self.front) % self.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.front == self.rear
    }

    pub fn is_full(&self) -> bool {
        self.advance(self.rear) == self.front
    }

    /// Appends `entry` at the rear. Fails with `QueueError::Capacity` when the
    /// queue already holds `usable_capacity()` entries, leaving it unchanged.
    pub fn enqueue(&mut self, entry: PendingEntry) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Capacity { capacity: self.capacity() });
        }
        debug!(id = %entry.id, slot = self.rear, "enqueueing pending entry");
        self.slots[self.rear] = Some(entry);
        self.rear = self.advance(self.rear);
        Ok(())
    }

    /// Removes and returns the oldest entry.
    pub fn dequeue(&mut self) -> Result<PendingEntry, QueueError> {
        if self.is_empty() {
            return Err(QueueError::Empty);
        }
        let entry = self.slots[self.front].take().ok_or(QueueError::Empty)?;
        debug!(id = %entry.id, slot = self.front, "dequeued pending entry");
        self.front = self.advance(self.front);
        Ok(entry)
    }

    /// The oldest entry, without removing it.
    pub fn peek(&self) -> Option<&PendingEntry> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.front].as_ref()
        }
    }

    /// Iterates the pending entries from front to rear without modifying the
    /// queue. The iterator can be cloned to restart from the same point.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse { queue: self, pos: self.front }
    }

    pub fn contains(&self, id: ReportId) -> bool {
        self.traverse().any(|entry| entry.id == id)
    }

    /// Removes the entry with the given id wherever it sits in the queue.
    ///
    /// Every entry behind the removed one moves forward one slot to close the
    /// gap, so the remaining entries keep their relative order, and `rear`
    /// steps back by one. If no entry has that id, returns
    /// `QueueError::NotFound` and nothing changes.
    pub fn remove_by_id(&mut self, id: ReportId) -> Result<PendingEntry, QueueError> {
        let Some(offset) = self.traverse().position(|entry| entry.id == id) else {
            return Err(QueueError::NotFound(id));
        };

        let mut slot = (self.front + offset) % self.capacity();
        let Some(removed) = self.slots[slot].take() else {
            return Err(QueueError::NotFound(id));
        };

        // shift everything after the gap forward by one
        loop {
            let next = self.advance(slot);
            if next == self.rear {
                break;
            }
            self.slots[slot] = self.slots[next].take();
            slot = next;
        }
        // `slot` is now the vacated last position
        self.rear = slot;

        debug!(%id, offset, remaining = self.len(), "removed pending entry out of order");
        Ok(removed)
    }

    fn advance(&self, slot: usize) -> usize {
        (slot + 1) % self.capacity()
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        PendingQueue::new()
    }
}

impl Digestible for PendingQueue {
    fn digest(&self) -> DigestOutput {
        let mut hasher = DefaultHasher::new();
        self.front.hash(&mut hasher);
        self.rear.hash(&mut hasher);
        for entry in self.traverse() {
            entry.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Front-to-rear iterator over a `PendingQueue`, created by
/// `PendingQueue::traverse`.
#[derive(Debug, Clone)]
pub struct Traverse<'a> {
    queue: &'a PendingQueue,
    pos: usize,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = &'a PendingEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos != self.queue.rear {
            let slot = &self.queue.slots[self.pos];
            self.pos = self.queue.advance(self.pos);
            if let Some(entry) = slot {
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let capacity = self.queue.capacity();
        let remaining = (self.queue.rear + capacity - self.pos) % capacity;
        (remaining, Some(remaining))
    }
}

impl<'a> IntoIterator for &'a PendingQueue {
    type Item = &'a PendingEntry;
    type IntoIter = Traverse<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.traverse()
    }
}
