//! `placement-affinity`: round-robin bulk EDT placement across the
//! platform's affinity table (section 4.7).

use parking_lot::Mutex;

use crate::db::Db;
use crate::edt::{Edt, EdtFlags};
use crate::error::SchedulerResult;
use crate::guid::Guid;
use crate::hint::{DbProperty, EdtProperty};
use crate::message::{NotifyKind, PolicyMessage};
use crate::transport::Location;

use super::{Heuristic, HeuristicKind};

pub struct PlacementAffinity {
    affinity_table: Vec<Location>,
    /// Spin-lock around the round-robin cursor (section 4.7). A
    /// `parking_lot::Mutex` is the fast, uncontended-friendly spin-then-park
    /// lock the rest of this crate uses for the same role.
    cursor: Mutex<usize>,
    here: Location,
}

impl PlacementAffinity {
    pub fn new(affinity_table: Vec<Location>, here: Location) -> Self {
        Self {
            affinity_table,
            cursor: Mutex::new(0),
            here,
        }
    }

    fn next_in_table(&self) -> Option<Location> {
        if self.affinity_table.is_empty() {
            return None;
        }
        let mut cursor = self.cursor.lock();
        let dest = self.affinity_table[*cursor % self.affinity_table.len()];
        *cursor += 1;
        Some(dest)
    }

    /// `notify(pre-process-msg)` for an EDT-create: runtime EDTs stay
    /// local; user EDTs use an explicit affinity hint, else cycle the
    /// table.
    pub fn place_edt_create(&self, edt: &mut Edt) -> Location {
        if edt.flags.contains(EdtFlags::RUNTIME_EDT) {
            edt.location = self.here;
            return self.here;
        }

        let dest = if let Ok(raw) = edt.hint.get_u64(EdtProperty::Affinity) {
            self.affinity_table
                .get(raw as usize % self.affinity_table.len().max(1))
                .copied()
                .unwrap_or(self.here)
        } else {
            self.next_in_table().unwrap_or(self.here)
        };

        edt.location = dest;
        dest
    }

    /// DB-creates follow the affinity hint; absent one, they stay local.
    pub fn place_db_create(&self, db: &mut Db) -> Location {
        if let Ok(raw) = db.hint.get_u64(DbProperty::Affinity) {
            if let Some(dest) = self.affinity_table.get(raw as usize % self.affinity_table.len().max(1)) {
                db.home = *dest;
                return *dest;
            }
        }
        self.here
    }
}

impl Heuristic for PlacementAffinity {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::PlacementAffinity
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
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_edt() -> Edt {
        Edt::new(Guid(1), Guid(100), 0, 0)
    }

    #[test]
    fn runtime_edt_always_stays_local() {
        let pa = PlacementAffinity::new(vec![Location(1), Location(2)], Location(0));
        let mut edt = user_edt();
        edt.flags.insert(EdtFlags::RUNTIME_EDT);
        assert_eq!(pa.place_edt_create(&mut edt), Location(0));
    }

    #[test]
    fn user_edt_without_hint_cycles_affinity_table() {
        let pa = PlacementAffinity::new(vec![Location(1), Location(2)], Location(0));
        let mut a = user_edt();
        let mut b = user_edt();
        assert_eq!(pa.place_edt_create(&mut a), Location(1));
        assert_eq!(pa.place_edt_create(&mut b), Location(2));
    }

    #[test]
    fn affinity_hint_overrides_round_robin() {
        let pa = PlacementAffinity::new(vec![Location(1), Location(2)], Location(0));
        let mut edt = user_edt();
        edt.hint.set_u64(EdtProperty::Affinity, 0).unwrap();
        assert_eq!(pa.place_edt_create(&mut edt), Location(1));
    }
}
