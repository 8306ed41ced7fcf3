//! Per-worker array of work-stealing deques, with an optional dedicated
//! comm-worker slot (section 3, section 4.2 `get_for_location`).
//!
//! `Wst` is what the HC heuristic's `rootObj` actually is: one deque per
//! execution worker, plus (when the PD runs a comm-delegate) a deque the
//! comm worker drains. `get_for_location` is how `Deque` operations reach a
//! specific worker's queue without the caller needing to know the array
//! layout.

use crossbeam_deque::Stealer;

use super::{CountFlags, Deque, Mapping, Position, SchedulerObject, SchedulerObjectKind};
use crate::error::{SchedulerError, SchedulerResult};
use crate::transport::Location;

pub struct Wst<T> {
    workers: Vec<Deque<T>>,
    comm_worker: Option<Deque<T>>,
}

impl<T> Wst<T> {
    pub fn new(worker_count: usize, has_comm_worker: bool) -> Self {
        let workers = (0..worker_count).map(|_| Deque::new()).collect();
        let comm_worker = has_comm_worker.then(Deque::new);
        Self { workers, comm_worker }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn worker(&self, idx: usize) -> Option<&Deque<T>> {
        self.workers.get(idx)
    }

    pub fn comm_worker(&self) -> Option<&Deque<T>> {
        self.comm_worker.as_ref()
    }

    pub fn stealers(&self) -> Vec<Stealer<T>> {
        self.workers.iter().map(Deque::stealer).collect()
    }

    /// Push onto worker `idx`'s own deque (owner push, section 5).
    pub fn push_to(&self, idx: usize, item: T) -> SchedulerResult<()> {
        self.workers
            .get(idx)
            .ok_or_else(|| SchedulerError::InvalidArgument(format!("no worker at index {idx}")))?
            .push(item);
        Ok(())
    }

    /// Round-robins from `start` looking for a worker holding an item,
    /// mimicking the random-victim-selection-then-scan the HC heuristic
    /// performs when `get_work` is called on an empty local deque.
    pub fn steal_from_any(&self, start: usize) -> Option<T> {
        let n = self.workers.len();
        if n == 0 {
            return None;
        }
        for offset in 0..n {
            let idx = (start + offset) % n;
            if let Some(item) = self.workers[idx].steal() {
                return Some(item);
            }
        }
        None
    }

    pub fn total_len(&self) -> usize {
        self.workers.iter().map(Deque::len).sum::<usize>()
            + self.comm_worker.as_ref().map(Deque::len).unwrap_or(0)
    }
}

impl<T> Default for Wst<T> {
    fn default() -> Self {
        Self::new(0, false)
    }
}

impl<T> SchedulerObject for Wst<T> {
    type Item = T;

    fn kind(&self) -> SchedulerObjectKind {
        SchedulerObjectKind::Wst
    }

    /// Plain `insert`/`remove` operate on worker 0; real placement goes
    /// through [`Wst::push_to`] or [`Wst::get_for_location`].
    fn insert(&mut self, position: Position, item: T) -> SchedulerResult<()> {
        self.workers
            .first_mut()
            .ok_or_else(|| SchedulerError::NotFound("no workers in Wst".into()))?
            .insert(position, item)
    }

    fn remove(&mut self, position: Position) -> SchedulerResult<Option<T>> {
        self.workers
            .first_mut()
            .ok_or_else(|| SchedulerError::NotFound("no workers in Wst".into()))?
            .remove(position)
    }

    fn count(&self, _flags: CountFlags) -> usize {
        self.total_len()
    }

    fn get_for_location(&self, loc: Location, mapping: Mapping) -> SchedulerResult<()> {
        let idx = loc.0 as usize;
        match mapping {
            Mapping::Worker(w) if w < self.workers.len() => Ok(()),
            _ if idx < self.workers.len() => Ok(()),
            _ => Err(SchedulerError::NotFound(format!(
                "no worker for location {loc}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_to_specific_worker_then_owner_pops_it() {
        let wst: Wst<i32> = Wst::new(4, false);
        wst.push_to(2, 42).unwrap();
        assert_eq!(wst.worker(2).unwrap().pop(), Some(42));
    }

    #[test]
    fn steal_from_any_finds_nonempty_worker() {
        let wst: Wst<i32> = Wst::new(4, false);
        wst.push_to(3, 99).unwrap();
        assert_eq!(wst.steal_from_any(0), Some(99));
    }

    #[test]
    fn comm_worker_is_separate_from_execution_workers() {
        let wst: Wst<i32> = Wst::new(2, true);
        wst.comm_worker().unwrap().push(7);
        assert!(wst.worker(0).unwrap().is_empty());
        assert_eq!(wst.comm_worker().unwrap().pop(), Some(7));
    }
}
