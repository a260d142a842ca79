use std::collections::VecDeque;
use std::fmt;

/// Bounded queue that evicts its oldest item when full. Iteration runs
/// newest first.
pub struct CircularQueue<T> {
    deque: VecDeque<T>,
    capacity: usize,
    pushed: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
            pushed: self.pushed,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularQueue")
            .field("capacity", &self.capacity)
            .field("pushed", &self.pushed)
            .field("items", &self.deque)
            .finish()
    }
}

impl<T> CircularQueue<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            deque: VecDeque::with_capacity(cap),
            capacity: cap.max(1),
            pushed: 0,
        }
    }

    /// Adds an item, returning the evicted one if the queue was full.
    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.deque.pop_back()
        } else {
            None
        };

        self.deque.push_front(item);
        self.pushed += 1;

        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items pushed since creation or the last `clear`, evicted ones included.
    #[inline]
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    #[inline]
    pub fn clear(&mut self) {
        self.deque.clear();
        self.pushed = 0;
    }

    #[inline]
    pub fn newest(&self) -> Option<&T> {
        self.deque.front()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        self.deque.iter()
    }

    /// Up to `n` most recent items, newest first.
    #[inline]
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &'_ T> {
        self.deque.iter().take(n)
    }
}
