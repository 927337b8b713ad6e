//! Fixed-capacity circular buffer
//!
//! `RingBuffer` keeps the head/tail arithmetic of the request queue in one
//! place. It is not synchronized; the queue wraps it in its own lock.
//!
//! Invariants kept by every operation:
//! - `0 <= len <= capacity`
//! - `tail == (head + len) % capacity`
//! - slots in `head..head + len` (mod capacity) are `Some`, all others `None`

/// Bounded FIFO over a preallocated slot array
#[derive(Debug)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` items
    ///
    /// A zero capacity buffer is always full; callers validate capacity
    /// before building one.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        RingBuffer {
            slots,
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Number of free slots
    pub fn free(&self) -> usize {
        self.capacity() - self.len
    }

    /// Append at the tail
    ///
    /// Returns the item back if the buffer is full.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.capacity();
        self.len += 1;
        Ok(())
    }

    /// Remove from the head
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        item
    }
}
