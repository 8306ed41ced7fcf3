//! `static`: round-robin placement driven by disperse/affinity hints
//! (section 4.5).
//!
//! Named `static_heuristic` rather than `static` because the latter is a
//! Rust keyword.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::db::Db;
use crate::edt::Edt;
use crate::error::SchedulerResult;
use crate::guid::Guid;
use crate::hint::{DbProperty, Disperse, EdtProperty};
use crate::message::{NotifyKind, PolicyMessage};
use crate::transport::Location;

use super::{Heuristic, HeuristicKind};

pub struct StaticHeuristic {
    counter: AtomicU64,
    worker_count: u64,
    /// Platform-affinity table, excluding the comm worker at index 0
    /// (section 4.5).
    affinity_table: Vec<Location>,
    distributed: bool,
    here: Location,
}

impl StaticHeuristic {
    pub fn new(worker_count: u64, affinity_table: Vec<Location>, distributed: bool, here: Location) -> Self {
        Self {
            counter: AtomicU64::new(0),
            worker_count,
            affinity_table,
            distributed,
            here,
        }
    }

    /// `notify(pre-process-msg)` for an EDT-create with the `disperse`
    /// hint set: round-robins a worker id, and — when distributed with no
    /// affinity hint — a destination PD.
    pub fn place_edt_create(&self, edt: &mut Edt) -> Location {
        let wants_disperse = edt.hint.get_disperse().is_ok();
        if !wants_disperse {
            return self.here;
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let worker_id = n % self.worker_count.max(1);
        let _ = edt.hint.set_u64(EdtProperty::Space, worker_id);

        if self.distributed && edt.hint.get_u64(EdtProperty::Affinity).is_err() && !self.affinity_table.is_empty() {
            let dest = self.affinity_table[(n as usize) % self.affinity_table.len()];
            edt.location = dest;
            dest
        } else {
            self.here
        }
    }

    /// `db-create` counterpart: honours `db-affinity` when present, else
    /// leaves the DB local.
    pub fn place_db_create(&self, db: &mut Db) -> Location {
        if let Ok(raw) = db.hint.get_u64(DbProperty::Affinity) {
            let dest = self.affinity_table.get(raw as usize % self.affinity_table.len().max(1)).copied();
            if let Some(dest) = dest {
                db.home = dest;
                return dest;
            }
        }
        self.here
    }

    /// `notify(edt-ready)`: honour `edt-space` if present, otherwise the
    /// caller's own worker id.
    pub fn worker_for_ready(&self, edt: &Edt, caller_worker: u64) -> u64 {
        edt.hint.get_u64(EdtProperty::Space).unwrap_or(caller_worker)
    }
}

impl Heuristic for StaticHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Static
    }

    fn get_work(&self, _worker: usize) -> SchedulerResult<Option<Guid>> {
        Ok(None)
    }

    fn notify(
        &self,
        _kind: NotifyKind,
        _edt: Option<Guid>,
        _db: Option<Guid>,
    ) -> SchedulerResult<Vec<PolicyMessage>> {
        // Placement decisions need the full `Edt`/`Db` value, not just a
        // guid, so callers go through `place_edt_create`/`place_db_create`
        // directly; this trait method exists only for uniform dispatch.
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edt() -> Edt {
        Edt::new(Guid(1), Guid(100), 0, 0)
    }

    #[test]
    fn disperse_hint_round_robins_worker_id() {
        let s = StaticHeuristic::new(4, vec![], false, Location(0));
        let mut a = edt();
        a.hint.set_disperse(Disperse::Near);
        let mut b = edt();
        b.hint.set_disperse(Disperse::Near);

        s.place_edt_create(&mut a);
        s.place_edt_create(&mut b);

        assert_eq!(a.hint.get_u64(EdtProperty::Space).unwrap(), 0);
        assert_eq!(b.hint.get_u64(EdtProperty::Space).unwrap(), 1);
    }

    #[test]
    fn no_disperse_hint_leaves_edt_unplaced() {
        let s = StaticHeuristic::new(4, vec![], false, Location(0));
        let mut a = edt();
        let dest = s.place_edt_create(&mut a);
        assert_eq!(dest, Location(0));
        assert!(a.hint.get_u64(EdtProperty::Space).is_err());
    }

    #[test]
    fn distributed_disperse_picks_destination_pd() {
        let s = StaticHeuristic::new(2, vec![Location(1), Location(2)], true, Location(0));
        let mut a = edt();
        a.hint.set_disperse(Disperse::Any);
        let dest = s.place_edt_create(&mut a);
        assert_eq!(dest, Location(1));
        assert_eq!(a.location, Location(1));
    }
}
