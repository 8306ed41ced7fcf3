//! `DbSpace` / `DbTime`: per-PD DB state and placement timeline.
//!
//! Every op in section 4.9's table is a method here. None of them send
//! messages directly — each returns the [`DbEffect`]s its caller (the ST
//! heuristic, normally) must carry out, so the state machine itself stays
//! pure and unit-testable without a transport. Locking (the per-DbSpace
//! spin-lock and the PdSpace map-insert lock from section 5) is the
//! responsibility of the container that holds a `DbSpace`, not of this type.

use std::collections::VecDeque;

use crate::edt::AccessMode;
use crate::error::{SchedulerError, SchedulerResult};
use crate::guid::Guid;
use crate::transport::Location;

/// `state ∈ {proxy, info, local-inactive, local-active, remote-inactive}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbSpaceState {
    Proxy,
    Info,
    LocalInactive,
    LocalActive,
    RemoteInactive,
}

impl DbSpaceState {
    fn is_local(self) -> bool {
        matches!(self, DbSpaceState::LocalActive | DbSpaceState::LocalInactive)
    }
}

/// One slot on a DbSpace's placement timeline.
#[derive(Debug, Clone)]
pub struct DbTime {
    pub space: Location,
    pub time: u64,
    pub edt_scheduled_count: u64,
    pub edt_done_count: u64,
    /// Set only on the scheduler-node's DbSpace.
    pub scheduler_count: Option<u64>,
    pub scheduler_done: bool,
    pub wait_list: Vec<Guid>,
    pub ready_list: Vec<Guid>,
    pub exclusive_waiter_count: u64,
}

impl DbTime {
    pub fn new(space: Location, time: u64) -> Self {
        Self {
            space,
            time,
            edt_scheduled_count: 0,
            edt_done_count: 0,
            scheduler_count: None,
            scheduler_done: false,
            wait_list: Vec::new(),
            ready_list: Vec::new(),
            exclusive_waiter_count: 0,
        }
    }
}

/// A message the DbSpace state machine wants its caller to send. Kept
/// deliberately thin (no payload bytes) — the ST heuristic fills in the
/// actual `PolicyMessage` from these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbEffect {
    /// `analyze(create)` to the scheduler node: a new DB exists.
    AnalyzeCreate { to: Location, db: Guid, size: u64 },
    /// `db-done` to the scheduler node: this PD drained a DbTime.
    AnalyzeDone { to: Location, db: Guid, time: u64 },
    /// `analyze(update)` kicking off a time-shift move to `to`.
    AnalyzeUpdate { to: Location, db: Guid, time: u64 },
    /// `SCHED_TRANSACT` carrying the DB's bytes to `to`.
    Transact { to: Location, db: Guid },
    /// Wake every EDT in the returned list (they were parked on a waitList).
    WakeWaiters { edts: Vec<Guid> },
}

/// Per-(PD, DB-GUID) scheduler object tracking a DB's local state and
/// placement timeline (section 3).
#[derive(Debug, Clone)]
pub struct DbSpace {
    pub guid: Guid,
    pub db_size: u64,
    pub ptr: Option<u64>,
    pub state: DbSpaceState,
    pub timeline: VecDeque<DbTime>,
    pub pending_proxies: Vec<Guid>,
    pub active_count: u64,
    pub mode: AccessMode,
    pub free: bool,
    /// Whether this instance is the scheduler-node's view of the DB (as
    /// opposed to a home-PD view). Distinct objects communicate by message
    /// even when they share a GUID (section 3).
    pub is_scheduler_side: bool,
}

impl DbSpace {
    fn assert_invariants(&self) {
        debug_assert!(
            self.state != DbSpaceState::Proxy || (self.db_size == 0 && self.ptr.is_none()),
            "proxy DbSpace must have no size or ptr"
        );
        debug_assert_eq!(
            self.ptr.is_some(),
            self.state.is_local(),
            "ptr is set iff state is local-*"
        );
        for w in self.timeline.iter().zip(self.timeline.iter().skip(1)) {
            debug_assert!(w.0.time < w.1.time, "DbTime timeline must be strictly increasing");
        }
        for t in &self.timeline {
            debug_assert!(
                t.edt_done_count <= t.edt_scheduled_count,
                "edtDoneCount must never exceed edtScheduledCount"
            );
        }
    }

    /// `db-create`: a local EDT creates a DB. `ptr` is `Some` when the EDT
    /// already supplied local storage, `None` when only metadata exists yet
    /// (the `info` state).
    pub fn create(
        guid: Guid,
        size: u64,
        ptr: Option<u64>,
        space: Location,
        time: u64,
        scheduler_location: Location,
        here: Location,
    ) -> (Self, Vec<DbEffect>) {
        let state = if ptr.is_some() {
            DbSpaceState::LocalActive
        } else {
            DbSpaceState::Info
        };

        let mut timeline = VecDeque::new();
        timeline.push_back(DbTime::new(space, time));

        let db_space = DbSpace {
            guid,
            db_size: if ptr.is_some() { size } else { 0 },
            ptr,
            state,
            timeline,
            pending_proxies: Vec::new(),
            active_count: 0,
            mode: AccessMode::Rw,
            free: false,
            is_scheduler_side: false,
        };
        db_space.assert_invariants();

        let mut effects = Vec::new();
        if here != scheduler_location {
            effects.push(DbEffect::AnalyzeCreate { to: scheduler_location, db: guid, size });
        }

        (db_space, effects)
    }

    /// `db-acquire`: a local EDT acquires an existing DB.
    pub fn acquire(&mut self) -> SchedulerResult<()> {
        if self.ptr.is_none() {
            return Err(SchedulerError::Internal(format!(
                "db-acquire on {} with no local ptr",
                self.guid
            )));
        }
        self.active_count += 1;
        if self.state == DbSpaceState::LocalInactive {
            self.state = DbSpaceState::LocalActive;
        }
        self.assert_invariants();
        Ok(())
    }

    /// `db-release`: a local EDT releases. Returns the effects to carry out
    /// if this release drains the head DbTime (a `db-done` to the scheduler
    /// node, and local destruction if `free` was already requested).
    pub fn release(
        &mut self,
        scheduler_location: Location,
        here: Location,
    ) -> SchedulerResult<Vec<DbEffect>> {
        if self.active_count == 0 {
            return Err(SchedulerError::Internal(format!(
                "db-release on {} with no outstanding acquire",
                self.guid
            )));
        }
        self.active_count -= 1;

        let mut effects = Vec::new();
        if let Some(head) = self.timeline.front_mut() {
            head.edt_done_count += 1;
            if head.edt_done_count == head.edt_scheduled_count && self.active_count == 0 {
                self.state = DbSpaceState::LocalInactive;
                if here != scheduler_location {
                    effects.push(DbEffect::AnalyzeDone {
                        to: scheduler_location,
                        db: self.guid,
                        time: head.time,
                    });
                }
            }
        }
        self.assert_invariants();
        Ok(effects)
    }

    /// `db-free`: user free. Decrements the latent per-PD acquire unless
    /// `no_release`, then follows the same finalisation path as `release`.
    pub fn free(
        &mut self,
        no_release: bool,
        scheduler_location: Location,
        here: Location,
    ) -> SchedulerResult<Vec<DbEffect>> {
        self.free = true;
        if !no_release && self.active_count > 0 {
            return self.release(scheduler_location, here);
        }
        Ok(Vec::new())
    }

    /// Whether this DbSpace is finalised and may be destroyed: drained,
    /// inactive, and `free`d.
    pub fn is_ready_to_destroy(&self) -> bool {
        self.free && self.state == DbSpaceState::LocalInactive && self.active_count == 0
    }

    /// `db-at-scheduler`: scheduler-node variant of create. Creates or
    /// upgrades (`proxy -> info`) the scheduler-side DbSpace.
    pub fn at_scheduler(existing: Option<&mut DbSpace>, guid: Guid, size: u64, space: Location, time: u64) -> Option<DbSpace> {
        match existing {
            Some(db) => {
                if db.state == DbSpaceState::Proxy {
                    db.state = DbSpaceState::Info;
                    db.db_size = size;
                }
                None
            }
            None => {
                let mut timeline = VecDeque::new();
                timeline.push_back(DbTime::new(space, time));
                Some(DbSpace {
                    guid,
                    db_size: size,
                    ptr: None,
                    state: DbSpaceState::Info,
                    timeline,
                    pending_proxies: Vec::new(),
                    active_count: 0,
                    mode: AccessMode::Rw,
                    free: false,
                    is_scheduler_side: true,
                })
            }
        }
    }

    /// `db-done-at-scheduler`: all EDTs of this DbTime finished at some
    /// space. Increments `edtDoneCount`; if it now equals `schedulerCount`
    /// and a later DbTime exists, marks `schedulerDone` (enabling
    /// time-shift).
    pub fn done_at_scheduler(&mut self, time: u64) -> SchedulerResult<()> {
        debug_assert!(self.is_scheduler_side);
        let has_next = self
            .timeline
            .iter()
            .any(|t| t.time > time);

        let slot = self
            .timeline
            .iter_mut()
            .find(|t| t.time == time)
            .ok_or_else(|| SchedulerError::NotFound(format!("no DbTime {time} on {}", self.guid)))?;

        slot.edt_done_count += 1;

        if let Some(scheduled) = slot.scheduler_count {
            if slot.edt_done_count == scheduled && has_next {
                slot.scheduler_done = true;
            }
        }
        self.assert_invariants();
        Ok(())
    }

    /// `db-time-shift-at-scheduler`: a DbTime became `schedulerDone`. Drops
    /// the head DbTime (unless it's locally pinned — i.e. the caller still
    /// has work outstanding there) and returns the effect that initiates the
    /// move to the next space.
    pub fn time_shift_at_scheduler(&mut self) -> SchedulerResult<Vec<DbEffect>> {
        debug_assert!(self.is_scheduler_side);
        let head_done = matches!(self.timeline.front(), Some(t) if t.scheduler_done);
        if !head_done {
            return Ok(Vec::new());
        }

        self.timeline.pop_front();
        let next = self
            .timeline
            .front()
            .ok_or_else(|| SchedulerError::Internal("schedulerDone requires a later DbTime".into()))?;

        Ok(vec![DbEffect::AnalyzeUpdate {
            to: next.space,
            db: self.guid,
            time: next.time,
        }])
    }

    /// `db-move-src`: source PD instructed to ship the DB.
    pub fn move_src(&mut self, to: Location) -> SchedulerResult<Vec<DbEffect>> {
        if self.state != DbSpaceState::LocalInactive {
            return Err(SchedulerError::Internal(format!(
                "db-move-src requires local-inactive, got {:?}",
                self.state
            )));
        }
        self.state = DbSpaceState::Info;
        self.ptr = None;
        self.assert_invariants();
        Ok(vec![DbEffect::Transact { to, db: self.guid }])
    }

    /// `db-move-dst`: destination PD acknowledges arrival is imminent.
    /// Creates or upgrades the DbSpace; marks `remote-inactive` if the
    /// DbTime already has waiters.
    pub fn move_dst(existing: Option<&mut DbSpace>, guid: Guid, size: u64, space: Location, time: u64) -> Option<DbSpace> {
        match existing {
            Some(db) => {
                if db.timeline.front().map_or(false, |t| !t.wait_list.is_empty()) {
                    db.state = DbSpaceState::RemoteInactive;
                }
                None
            }
            None => {
                let mut timeline = VecDeque::new();
                timeline.push_back(DbTime::new(space, time));
                Some(DbSpace {
                    guid,
                    db_size: size,
                    ptr: None,
                    state: DbSpaceState::RemoteInactive,
                    timeline,
                    pending_proxies: Vec::new(),
                    active_count: 0,
                    mode: AccessMode::Rw,
                    free: false,
                    is_scheduler_side: false,
                })
            }
        }
    }

    /// `db-at-space`: the DB payload physically arrived. Stores the ptr and
    /// kicks the waitlist, transitioning to `local-active` if anyone was
    /// waiting, `local-inactive` otherwise.
    pub fn at_space(&mut self, ptr: u64, size: u64) -> Vec<DbEffect> {
        self.ptr = Some(ptr);
        self.db_size = size;

        let waiters = self
            .timeline
            .front_mut()
            .map(|t| std::mem::take(&mut t.wait_list))
            .unwrap_or_default();

        self.state = if waiters.is_empty() {
            DbSpaceState::LocalInactive
        } else {
            DbSpaceState::LocalActive
        };
        self.assert_invariants();

        if waiters.is_empty() {
            Vec::new()
        } else {
            vec![DbEffect::WakeWaiters { edts: waiters }]
        }
    }

    /// `edt-at-space`: EDT arrived at its scheduled PD; checks one
    /// dependence. If the DB isn't present at this time-slot locally, the
    /// EDT is appended to that DbTime's waitList and the caller should
    /// suspend it. Always increments `edtScheduledCount`.
    pub fn edt_at_space(&mut self, time: u64, edt: Guid) -> SchedulerResult<bool> {
        let slot = self
            .timeline
            .iter_mut()
            .find(|t| t.time == time)
            .ok_or_else(|| SchedulerError::NotFound(format!("no DbTime {time} on {}", self.guid)))?;

        slot.edt_scheduled_count += 1;

        let db_present = self.ptr.is_some();
        if !db_present {
            slot.wait_list.push(edt);
        }
        self.assert_invariants();
        Ok(db_present)
    }

    /// Register that a new DbTime is wanted for this PD's timeline, keeping
    /// it ordered. Used on the scheduler side when ST placement assigns
    /// `refTime+1` to a dep DB (section 4.9 step 5/6).
    pub fn ensure_time_slot(&mut self, space: Location, time: u64) -> &mut DbTime {
        if !self.timeline.iter().any(|t| t.time == time) {
            let insert_at = self.timeline.iter().position(|t| t.time > time).unwrap_or(self.timeline.len());
            self.timeline.insert(insert_at, DbTime::new(space, time));
        }
        self.timeline.iter_mut().find(|t| t.time == time).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(n: u32) -> Location {
        Location(n)
    }

    #[test]
    fn create_local_active_needs_no_analyze_on_scheduler_node() {
        let (db, effects) = DbSpace::create(Guid(1), 64, Some(0xabc), loc(0), 1, loc(0), loc(0));
        assert_eq!(db.state, DbSpaceState::LocalActive);
        assert!(effects.is_empty());
    }

    #[test]
    fn create_on_non_scheduler_node_emits_analyze_create() {
        let (db, effects) = DbSpace::create(Guid(1), 64, Some(0xabc), loc(1), 1, loc(0), loc(1));
        assert_eq!(db.state, DbSpaceState::LocalActive);
        assert_eq!(
            effects,
            vec![DbEffect::AnalyzeCreate { to: loc(0), db: Guid(1), size: 64 }]
        );
    }

    #[test]
    fn acquire_then_release_tracks_done_count_and_drains() {
        let (mut db, _) = DbSpace::create(Guid(1), 64, Some(0xabc), loc(0), 1, loc(0), loc(0));
        db.timeline.front_mut().unwrap().edt_scheduled_count = 1;
        db.acquire().unwrap();
        assert_eq!(db.active_count, 1);

        let effects = db.release(loc(0), loc(0)).unwrap();
        assert_eq!(db.active_count, 0);
        assert_eq!(db.state, DbSpaceState::LocalInactive);
        assert_eq!(db.timeline.front().unwrap().edt_done_count, 1);
        assert!(effects.is_empty(), "scheduler-local release emits no analyze(done)");
    }

    #[test]
    fn non_scheduler_release_emits_analyze_done_when_drained() {
        let (mut db, _) = DbSpace::create(Guid(1), 64, Some(0xabc), loc(1), 1, loc(0), loc(1));
        db.timeline.front_mut().unwrap().edt_scheduled_count = 1;
        db.acquire().unwrap();
        let effects = db.release(loc(0), loc(1)).unwrap();
        assert_eq!(
            effects,
            vec![DbEffect::AnalyzeDone { to: loc(0), db: Guid(1), time: 1 }]
        );
    }

    #[test]
    fn move_src_then_dst_then_at_space_restores_local_state() {
        let (mut src, _) = DbSpace::create(Guid(1), 64, Some(0xabc), loc(0), 1, loc(0), loc(0));
        src.timeline.front_mut().unwrap().edt_scheduled_count = 0;
        // Must be local-inactive before move-src.
        src.state = DbSpaceState::LocalInactive;
        let effects = src.move_src(loc(1)).unwrap();
        assert_eq!(src.state, DbSpaceState::Info);
        assert!(src.ptr.is_none());
        assert_eq!(effects, vec![DbEffect::Transact { to: loc(1), db: Guid(1) }]);

        let mut dst = DbSpace::move_dst(None, Guid(1), 0, loc(1), 1).unwrap();
        assert_eq!(dst.state, DbSpaceState::RemoteInactive);
        assert!(dst.ptr.is_none());

        dst.at_space(0xdead, 64);
        assert_eq!(dst.ptr, Some(0xdead));
        assert_eq!(dst.db_size, 64);
        assert_eq!(dst.state, DbSpaceState::LocalInactive);
    }

    #[test]
    fn edt_at_space_parks_edt_when_db_absent() {
        let mut db = DbSpace::move_dst(None, Guid(1), 0, loc(1), 1).unwrap();
        let present = db.edt_at_space(1, Guid(99)).unwrap();
        assert!(!present);
        assert_eq!(db.timeline.front().unwrap().wait_list, vec![Guid(99)]);
        assert_eq!(db.timeline.front().unwrap().edt_scheduled_count, 1);
    }

    #[test]
    fn done_at_scheduler_marks_scheduler_done_when_counts_match_and_later_slot_exists() {
        let mut db = DbSpace::at_scheduler(None, Guid(1), 64, loc(0), 1).unwrap();
        db.timeline.front_mut().unwrap().scheduler_count = Some(2);
        db.ensure_time_slot(loc(1), 2);

        db.done_at_scheduler(1).unwrap();
        assert!(!db.timeline.front().unwrap().scheduler_done);

        db.done_at_scheduler(1).unwrap();
        assert!(db.timeline.front().unwrap().scheduler_done);
    }

    #[test]
    fn time_shift_drops_head_and_emits_update_to_next_space() {
        let mut db = DbSpace::at_scheduler(None, Guid(1), 64, loc(0), 1).unwrap();
        db.ensure_time_slot(loc(1), 2);
        db.timeline.front_mut().unwrap().scheduler_done = true;

        let effects = db.time_shift_at_scheduler().unwrap();
        assert_eq!(db.timeline.len(), 1);
        assert_eq!(db.timeline.front().unwrap().space, loc(1));
        assert_eq!(
            effects,
            vec![DbEffect::AnalyzeUpdate { to: loc(1), db: Guid(1), time: 2 }]
        );
    }
}
