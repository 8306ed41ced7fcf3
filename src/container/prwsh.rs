//! Single shared priority heap with work-stealing fallback.
//!
//! `PrWsh` backs the Priority heuristic (section 4.6): all workers push
//! ready EDTs onto one [`BinHeap`] keyed by the EDT's `EDT_HINT_PRIORITY`,
//! rather than each worker owning its own deque. There's nothing to steal
//! in the Chase-Lev sense since every worker already contends on the same
//! heap, but the type keeps the same `get_for_location` shape as `Wst` so
//! the Priority heuristic's `rootObj` is interchangeable with HC's.

use super::{BinHeap, CountFlags, Mapping, Position, SchedulerObject, SchedulerObjectKind};
use crate::error::SchedulerResult;
use crate::guid::Guid;
use crate::transport::Location;

pub struct PrWsh {
    heap: BinHeap<Guid>,
}

impl PrWsh {
    pub fn new() -> Self {
        Self { heap: BinHeap::new() }
    }

    pub fn push(&self, priority: i64, edt: Guid) {
        self.heap.push(priority, edt);
    }

    pub fn pop_highest(&self) -> Option<Guid> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Default for PrWsh {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerObject for PrWsh {
    type Item = Guid;

    fn kind(&self) -> SchedulerObjectKind {
        SchedulerObjectKind::PrWsh
    }

    fn insert(&mut self, _position: Position, item: Guid) -> SchedulerResult<()> {
        self.push(0, item);
        Ok(())
    }

    fn remove(&mut self, _position: Position) -> SchedulerResult<Option<Guid>> {
        Ok(self.pop_highest())
    }

    fn count(&self, _flags: CountFlags) -> usize {
        self.len()
    }

    /// Every worker shares the same heap, so any location resolves to it.
    fn get_for_location(&self, _loc: Location, _mapping: Mapping) -> SchedulerResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_worker_pulls_highest_priority_ready_edt() {
        let prwsh = PrWsh::new();
        prwsh.push(1, Guid(1));
        prwsh.push(9, Guid(2));
        assert_eq!(prwsh.pop_highest(), Some(Guid(2)));
        assert_eq!(prwsh.pop_highest(), Some(Guid(1)));
        assert!(prwsh.is_empty());
    }
}
