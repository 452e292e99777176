//! Min-priority queue of collapse candidates.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Queue handing out the item of lowest priority first.
///
/// Items of equal priority leave in insertion order.
pub trait PriorityQueue<T> {
    fn enqueue(&mut self, item: T, priority: f32);
    /// Remove the lowest-priority item and return it with its priority.
    fn dequeue(&mut self) -> Option<(T, f32)>;
    fn first(&self) -> Option<&T>;
    fn first_priority(&self) -> Option<f32>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Visit the queued items in unspecified order.
    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_>;
    fn clear(&mut self);
}

#[derive(Debug, Clone)]
struct Entry<T> {
    priority: f32,
    sequence: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so the max-heap pops the lowest priority, then the oldest entry.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// [`PriorityQueue`] over a binary heap
#[derive(Debug, Clone)]
pub struct BinaryHeapQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    sequence: u64,
}

impl<T> Default for BinaryHeapQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            sequence: 0,
        }
    }
}

impl<T> BinaryHeapQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            sequence: 0,
        }
    }
}

impl<T> PriorityQueue<T> for BinaryHeapQueue<T> {
    fn enqueue(&mut self, item: T, priority: f32) {
        self.heap.push(Entry {
            priority,
            sequence: self.sequence,
            item,
        });
        self.sequence += 1;
    }

    fn dequeue(&mut self) -> Option<(T, f32)> {
        self.heap.pop().map(|e| (e.item, e.priority))
    }

    fn first(&self) -> Option<&T> {
        self.heap.peek().map(|e| &e.item)
    }

    fn first_priority(&self) -> Option<f32> {
        self.heap.peek().map(|e| e.priority)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.heap.iter().map(|e| &e.item))
    }

    fn clear(&mut self) {
        self.heap.clear();
    }
}
