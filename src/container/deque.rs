//! Work-stealing deque.
//!
//! Built on `crossbeam_deque`'s Chase-Lev implementation: the owner pushes
//! and pops from one end (LIFO, for cache locality), thieves steal from the
//! other end (FIFO)
//! (section 5, section 8 invariant: "returns items to its owner in LIFO
//! order and to thieves in FIFO order, modulo races").

use crossbeam_deque::{Steal, Stealer, Worker};

use super::{CountFlags, Locator, Position, SchedulerObject, SchedulerObjectKind};
use crate::error::{SchedulerError, SchedulerResult};

/// A single work-stealing deque. One of these backs each worker slot of a
/// [`super::Wst`]; the CE heuristic also owns one per context.
pub struct Deque<T> {
    owner: Worker<T>,
}

impl<T> Deque<T> {
    pub fn new() -> Self {
        Self {
            owner: Worker::new_lifo(),
        }
    }

    /// A handle thieves use to steal from this deque. Cheap to clone and
    /// safe to hand to other worker threads.
    pub fn stealer(&self) -> Stealer<T> {
        self.owner.stealer()
    }

    /// Owner-side push (tail).
    pub fn push(&self, item: T) {
        self.owner.push(item);
    }

    /// Owner-side pop (tail, LIFO).
    pub fn pop(&self) -> Option<T> {
        self.owner.pop()
    }

    /// Steal a single item from this deque's other end (FIFO from the
    /// thief's perspective). Retries transparently on contention.
    pub fn steal(&self) -> Option<T> {
        loop {
            match self.owner.stealer().steal() {
                Steal::Success(item) => return Some(item),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.owner.len()
    }
}

impl<T> Default for Deque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SchedulerObject for Deque<T> {
    type Item = T;

    fn kind(&self) -> SchedulerObjectKind {
        SchedulerObjectKind::Deque
    }

    fn insert(&mut self, _position: Position, item: T) -> SchedulerResult<()> {
        // Every insert lands at the owner's push end; `position` is
        // accepted for contract uniformity but a Chase-Lev deque has only
        // one writable end.
        self.push(item);
        Ok(())
    }

    fn remove(&mut self, position: Position) -> SchedulerResult<Option<T>> {
        match position.locator {
            Locator::Tail => Ok(self.pop()),
            Locator::Head => Ok(self.steal()),
            Locator::Iterator(_) => Err(SchedulerError::NotSupported(
                "Deque has no iterator cursor".into(),
            )),
        }
    }

    fn count(&self, _flags: CountFlags) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_pops_lifo_thief_steals_fifo() {
        let deque: Deque<char> = Deque::new();
        deque.push('A');
        deque.push('B');
        deque.push('C');

        // Worker-0 (owner) pops last-in-first-out: C.
        assert_eq!(deque.pop(), Some('C'));

        // A thief steals first-in-first-out from the remaining items: A.
        assert_eq!(deque.steal(), Some('A'));

        // Owner still gets LIFO order from what remains: B.
        assert_eq!(deque.pop(), Some('B'));
        assert_eq!(deque.pop(), None);
    }
}
