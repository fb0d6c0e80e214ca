// =============================================================================
// BoundedSeries — fixed-capacity append-with-eviction buffer
// =============================================================================
//
// Every rolling window in the crate is one of these. Appending past capacity
// evicts the oldest element, so `len() <= capacity()` holds after every call,
// including right after `resize` and `reset`.

use std::collections::VecDeque;

/// Memory-bounded FIFO window, oldest element first.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedSeries<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedSeries<T> {
    /// Create an empty window that retains at most `capacity` items.
    ///
    /// A capacity of zero is legal and retains nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `value`, evicting the oldest entry once over capacity.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        self.items.push_back(value);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    /// Drop every buffered item; capacity is unchanged.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Change the capacity. Old contents are discarded, they belong to the
    /// old window size.
    pub fn resize(&mut self, capacity: usize) {
        self.reset();
        self.capacity = capacity;
        self.items.shrink_to(capacity);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.items.len() == self.capacity
    }

    /// Most recent item.
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// `get_from_end(0)` is the newest item, `get_from_end(1)` the one before.
    pub fn get_from_end(&self, offset: usize) -> Option<&T> {
        let len = self.items.len();
        if offset >= len {
            return None;
        }
        self.items.get(len - 1 - offset)
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + Clone {
        self.items.iter()
    }

    /// Iterate over the newest `n` items (or fewer), oldest first.
    pub fn last_n(&self, n: usize) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + Clone {
        let skip = self.items.len().saturating_sub(n);
        self.items.range(skip..)
    }
}

impl<T: Copy> BoundedSeries<T> {
    /// Copy of the newest `n` items (or fewer), oldest first.
    pub fn tail(&self, n: usize) -> Vec<T> {
        self.last_n(n).copied().collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().copied().collect()
    }
}
