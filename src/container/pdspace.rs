//! Per-policy-domain root container.
//!
//! `PdSpace` is the top-level scheduler object a policy domain's facade
//! holds as `rootObj` under the HC and HC-comm-delegate heuristics
//! (section 3, section 4.2): a bucket-locked map from DB guid to its
//! [`crate::db::DbSpace`], plus the [`Wst`] of per-worker EDT deques.
//! `get_for_location` descends into the `Wst` so the facade's `get_work`
//! can resolve straight to a worker's queue without knowing `PdSpace`'s
//! internal layout.

use super::{CountFlags, Map, Mapping, Position, SchedulerObject, SchedulerObjectKind, Wst};
use crate::db::DbSpace;
use crate::error::{SchedulerError, SchedulerResult};
use crate::guid::Guid;
use crate::transport::Location;

pub struct PdSpace {
    dbs: Map<Guid, DbSpace>,
    wst: Wst<Guid>,
}

impl PdSpace {
    pub fn new(worker_count: usize, has_comm_worker: bool) -> Self {
        Self {
            dbs: Map::new(),
            wst: Wst::new(worker_count, has_comm_worker),
        }
    }

    pub fn wst(&self) -> &Wst<Guid> {
        &self.wst
    }

    pub fn dbs(&self) -> &Map<Guid, DbSpace> {
        &self.dbs
    }

    /// Registers a freshly created `DbSpace`, as `db-space-create` does
    /// before returning its effects to the caller (section 3).
    pub fn register_db(&self, db_space: DbSpace) {
        self.dbs.put(db_space.guid, db_space);
    }

    pub fn with_db_mut<R>(&self, guid: &Guid, f: impl FnOnce(&mut DbSpace) -> R) -> Option<R> {
        self.dbs.with_mut(guid, f)
    }

    pub fn remove_db(&self, guid: &Guid) -> Option<DbSpace> {
        self.dbs.remove_key(guid)
    }

    /// Pushes a ready EDT guid onto the worker it was placed on.
    pub fn push_ready(&self, worker: usize, edt: Guid) -> SchedulerResult<()> {
        self.wst.push_to(worker, edt)
    }

    /// Pulls the next ready EDT for `worker`, falling back to stealing from
    /// its siblings when its own deque is empty (the HC `get_work` path,
    /// section 4.5).
    pub fn next_for_worker(&self, worker: usize) -> Option<Guid> {
        if let Some(d) = self.wst.worker(worker) {
            if let Some(edt) = d.pop() {
                return Some(edt);
            }
        }
        self.wst.steal_from_any(worker)
    }
}

impl SchedulerObject for PdSpace {
    type Item = Guid;

    fn kind(&self) -> SchedulerObjectKind {
        SchedulerObjectKind::PdSpace
    }

    fn insert(&mut self, position: Position, item: Guid) -> SchedulerResult<()> {
        self.wst.insert(position, item)
    }

    fn remove(&mut self, position: Position) -> SchedulerResult<Option<Guid>> {
        self.wst.remove(position)
    }

    fn count(&self, flags: CountFlags) -> usize {
        self.wst.count(flags)
    }

    fn get_for_location(&self, loc: Location, mapping: Mapping) -> SchedulerResult<()> {
        self.wst.get_for_location(loc, mapping).map_err(|_| {
            SchedulerError::NotFound(format!("PdSpace has no child at location {loc}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pull_ready_edt_for_worker() {
        let space = PdSpace::new(4, false);
        let edt = Guid(7);
        space.push_ready(1, edt).unwrap();
        assert_eq!(space.next_for_worker(1), Some(edt));
    }

    #[test]
    fn idle_worker_steals_from_sibling() {
        let space = PdSpace::new(4, false);
        let edt = Guid(99);
        space.push_ready(3, edt).unwrap();
        assert_eq!(space.next_for_worker(0), Some(edt));
    }

    #[test]
    fn register_and_look_up_db_space() {
        let space = PdSpace::new(2, false);
        let (db_space, _effects) =
            DbSpace::create(Guid(1), 4096, Some(0xabc), Location(0), 1, Location(0), Location(0));
        space.register_db(db_space);
        let found = space.with_db_mut(&Guid(1), |d| d.db_size).unwrap();
        assert_eq!(found, 4096);
    }
}
