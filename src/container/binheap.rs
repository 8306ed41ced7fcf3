//! Locked priority heap.
//!
//! Backs the Priority heuristic's ready list and `PrWsh`'s single shared
//! queue (section 3, section 4.6). Ordering is newest-priority-wins on
//! ties, matching the FIFO-within-priority-band behavior the Priority
//! heuristic's testable property expects.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use parking_lot::Mutex;

use super::{CountFlags, Position, SchedulerObject, SchedulerObjectKind};
use crate::error::SchedulerResult;

struct Entry<T> {
    priority: i64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority wins; among equal priorities, the entry pushed
        // first wins (FIFO), so `seq` compares in reverse.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct BinHeap<T> {
    inner: Mutex<BinaryHeap<Entry<T>>>,
    next_seq: Mutex<u64>,
}

impl<T> BinHeap<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BinaryHeap::new()),
            next_seq: Mutex::new(0),
        }
    }

    pub fn push(&self, priority: i64, item: T) {
        let mut seq_guard = self.next_seq.lock();
        let seq = *seq_guard;
        *seq_guard += 1;
        drop(seq_guard);
        self.inner.lock().push(Entry { priority, seq, item });
    }

    /// Pops the highest-priority item, ties broken FIFO.
    pub fn pop(&self) -> Option<T> {
        self.inner.lock().pop().map(|e| e.item)
    }

    pub fn peek_priority(&self) -> Option<i64> {
        self.inner.lock().peek().map(|e| e.priority)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for BinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SchedulerObject for BinHeap<T> {
    type Item = T;

    fn kind(&self) -> SchedulerObjectKind {
        SchedulerObjectKind::BinHeap
    }

    /// Priority isn't part of the uniform `insert` signature, so plain
    /// `SchedulerObject::insert` pushes at priority zero; callers that need
    /// a real priority use [`BinHeap::push`] directly.
    fn insert(&mut self, _position: Position, item: T) -> SchedulerResult<()> {
        self.push(0, item);
        Ok(())
    }

    fn remove(&mut self, _position: Position) -> SchedulerResult<Option<T>> {
        Ok(self.pop())
    }

    fn count(&self, _flags: CountFlags) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_highest_priority_first() {
        let heap: BinHeap<&str> = BinHeap::new();
        heap.push(1, "low");
        heap.push(10, "high");
        heap.push(5, "mid");
        assert_eq!(heap.pop(), Some("high"));
        assert_eq!(heap.pop(), Some("mid"));
        assert_eq!(heap.pop(), Some("low"));
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn equal_priority_breaks_fifo() {
        let heap: BinHeap<&str> = BinHeap::new();
        heap.push(1, "first");
        heap.push(1, "second");
        assert_eq!(heap.pop(), Some("first"));
        assert_eq!(heap.pop(), Some("second"));
    }
}
