//! `st`: the distributed space/time placement heuristic (section 4.9).
//!
//! One PD is `scheduler_location`; every other PD forwards space/time
//! analysis as `analyze` messages to it. `get_work`/`edt-ready` still drive
//! a plain work-stealing [`Wst`] locally — only DB lifecycle and placement
//! decisions are special here.
//!
//! Each DB's [`DbSpace`] lives behind its own `Arc<Mutex<_>>` (rather than
//! the bucket-locked [`crate::container::Map`] other heuristics use for
//! their root object) so the full-depv trylocking scheme below can acquire
//! and release individual DB locks independently of bucket placement.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};

use crate::container::Wst;
use crate::db::{DbEffect, DbSpace, EdtProxy};
use crate::edt::DepSlot;
use crate::error::{SchedulerError, SchedulerResult};
use crate::guid::Guid;
use crate::message::{AnalyzeKind, AnalyzeProperty, MessageKind, NotifyKind, PolicyMessage};
use crate::transport::Location;

use super::{Heuristic, HeuristicKind};

pub struct St {
    here: Location,
    scheduler_location: Location,
    neighbour_count: usize,
    db_spaces: DashMap<Guid, Arc<Mutex<DbSpace>>>,
    /// EdtProxies parked on the scheduler node awaiting a dep DB's `info`
    /// message, keyed by the EDT they suspend.
    proxies: DashMap<Guid, EdtProxy>,
    wst: Wst<Guid>,
    round_robin: std::sync::atomic::AtomicU64,
}

impl St {
    pub fn new(here: Location, scheduler_location: Location, neighbour_count: usize, worker_count: usize) -> Self {
        Self {
            here,
            scheduler_location,
            neighbour_count,
            db_spaces: DashMap::new(),
            proxies: DashMap::new(),
            wst: Wst::new(worker_count, false),
            round_robin: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn is_scheduler(&self) -> bool {
        self.here == self.scheduler_location
    }

    pub fn wst(&self) -> &Wst<Guid> {
        &self.wst
    }

    fn entry(&self, guid: Guid) -> Option<Arc<Mutex<DbSpace>>> {
        self.db_spaces.get(&guid).map(|e| e.clone())
    }

    // ---- DB state-machine ops (section 4.9 table) ----

    pub fn db_create(&self, guid: Guid, size: u64, ptr: Option<u64>, time: u64) -> Vec<DbEffect> {
        let (space, effects) = DbSpace::create(guid, size, ptr, self.here, time, self.scheduler_location, self.here);
        self.db_spaces.insert(guid, Arc::new(Mutex::new(space)));
        effects
    }

    pub fn db_acquire(&self, guid: Guid) -> SchedulerResult<()> {
        let arc = self.entry(guid).ok_or_else(|| SchedulerError::NotFound(guid.to_string()))?;
        let result = arc.lock().acquire();
        result
    }

    pub fn db_release(&self, guid: Guid) -> SchedulerResult<Vec<DbEffect>> {
        let arc = self.entry(guid).ok_or_else(|| SchedulerError::NotFound(guid.to_string()))?;
        let result = arc.lock().release(self.scheduler_location, self.here);
        result
    }

    pub fn db_free(&self, guid: Guid, no_release: bool) -> SchedulerResult<Vec<DbEffect>> {
        let arc = self.entry(guid).ok_or_else(|| SchedulerError::NotFound(guid.to_string()))?;
        let result = arc.lock().free(no_release, self.scheduler_location, self.here);
        result
    }

    /// `db-at-scheduler`: create or upgrade the scheduler-side DbSpace.
    pub fn db_at_scheduler(&self, guid: Guid, size: u64, space: Location, time: u64) {
        if let Some(arc) = self.entry(guid) {
            DbSpace::at_scheduler(Some(&mut *arc.lock()), guid, size, space, time);
        } else if let Some(fresh) = DbSpace::at_scheduler(None, guid, size, space, time) {
            self.db_spaces.insert(guid, Arc::new(Mutex::new(fresh)));
        }
    }

    pub fn db_done_at_scheduler(&self, guid: Guid, time: u64) -> SchedulerResult<()> {
        let arc = self.entry(guid).ok_or_else(|| SchedulerError::NotFound(guid.to_string()))?;
        let result = arc.lock().done_at_scheduler(time);
        result
    }

    pub fn db_time_shift_at_scheduler(&self, guid: Guid) -> SchedulerResult<Vec<DbEffect>> {
        let arc = self.entry(guid).ok_or_else(|| SchedulerError::NotFound(guid.to_string()))?;
        let result = arc.lock().time_shift_at_scheduler();
        result
    }

    pub fn db_move_src(&self, guid: Guid, to: Location) -> SchedulerResult<Vec<DbEffect>> {
        let arc = self.entry(guid).ok_or_else(|| SchedulerError::NotFound(guid.to_string()))?;
        let result = arc.lock().move_src(to);
        result
    }

    /// `db-move-dst`: create or upgrade the destination DbSpace.
    pub fn db_move_dst(&self, guid: Guid, size: u64, space: Location, time: u64) {
        if let Some(arc) = self.entry(guid) {
            DbSpace::move_dst(Some(&mut *arc.lock()), guid, size, space, time);
        } else if let Some(fresh) = DbSpace::move_dst(None, guid, size, space, time) {
            self.db_spaces.insert(guid, Arc::new(Mutex::new(fresh)));
        }
    }

    pub fn db_at_space(&self, guid: Guid, ptr: u64, size: u64) -> SchedulerResult<Vec<DbEffect>> {
        let arc = self.entry(guid).ok_or_else(|| SchedulerError::NotFound(guid.to_string()))?;
        let result = Ok(arc.lock().at_space(ptr, size));
        result
    }

    /// `edt-at-scheduler`: a dep DB isn't known to the scheduler yet, so
    /// park an [`EdtProxy`] and create a `proxy` DbSpace placeholder.
    pub fn edt_at_scheduler(&self, edt: Guid, requester: Location, deps: Vec<DepSlot>, suspend_index: usize) {
        self.proxies.insert(edt, EdtProxy::new(edt, requester, deps, suspend_index));
    }

    pub fn resume_proxy(&self, edt: Guid) -> Option<EdtProxy> {
        self.proxies.remove(&edt).map(|(_, p)| p)
    }

    pub fn edt_at_space(&self, guid: Guid, time: u64, edt: Guid) -> SchedulerResult<bool> {
        let arc = self.entry(guid).ok_or_else(|| SchedulerError::NotFound(guid.to_string()))?;
        let result = arc.lock().edt_at_space(time, edt);
        result
    }

    // ---- Deadlock-avoiding multi-dep locking ----

    /// Attempts to lock every dep's DbSpace in one pass; on any failure,
    /// releases everything already held and returns `None` so the caller
    /// can spin on the first still-held lock and retry (section 4.9:
    /// "sorted locking is explicitly rejected because it blocks unrelated
    /// chains").
    fn try_lock_deps<'a>(&self, arcs: &'a [Arc<Mutex<DbSpace>>]) -> Option<Vec<MutexGuard<'a, DbSpace>>> {
        let mut guards = Vec::with_capacity(arcs.len());
        for arc in arcs {
            match arc.try_lock() {
                Some(guard) => guards.push(guard),
                None => return None,
            }
        }
        Some(guards)
    }

    /// Retries [`Self::try_lock_deps`] until every dep locks in the same
    /// pass, spinning briefly between attempts.
    fn lock_all_deps<'a>(&self, arcs: &'a [Arc<Mutex<DbSpace>>]) -> Vec<MutexGuard<'a, DbSpace>> {
        loop {
            if let Some(guards) = self.try_lock_deps(arcs) {
                return guards;
            }
            std::hint::spin_loop();
        }
    }

    /// The space/time placement algorithm (section 4.9). `deps` names each
    /// dependence DB alongside its size (used to pick the reference DB).
    /// Returns the chosen `(space, time)` and the effects needed to record
    /// the decision on every dep's timeline.
    pub fn place_edt(&self, deps: &[(Guid, u64)]) -> SchedulerResult<((Location, u64), Vec<DbEffect>)> {
        debug_assert!(self.is_scheduler(), "placement runs on the scheduler PD");

        if self.neighbour_count == 0 {
            // Single-PD short circuit: every DB has exactly one time slot,
            // numbered 1.
            return Ok(((self.here, 1), Vec::new()));
        }

        if deps.is_empty() {
            // No useful deps: round-robin for load balancing instead of
            // running the full analysis.
            let n = self.round_robin.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let space = Location((n as u32) % (self.neighbour_count as u32 + 1));
            return Ok(((space, 1), Vec::new()));
        }

        let arcs: Vec<Arc<Mutex<DbSpace>>> = deps
            .iter()
            .map(|(g, _)| {
                self.entry(*g)
                    .ok_or_else(|| SchedulerError::NotFound(format!("no DbSpace for dep {g}")))
            })
            .collect::<SchedulerResult<_>>()?;

        let mut guards = self.lock_all_deps(&arcs);

        // Step 1: largest dep DB is the reference.
        let mut ref_idx = (0..deps.len())
            .max_by_key(|&i| deps[i].1)
            .expect("deps is non-empty");

        let chosen = loop {
            let ref_times: Vec<(Location, u64)> = guards[ref_idx]
                .timeline
                .iter()
                .map(|t| (t.space, t.time))
                .collect();

            let mut best: Option<(Location, u64, u64)> = None; // (space, time, cost)
            for (space, time) in ref_times {
                let mut cost = 0u64;
                let mut conflict = false;
                for (i, (_, size)) in deps.iter().enumerate() {
                    if i == ref_idx {
                        continue;
                    }
                    let has_slot = guards[i].timeline.iter().any(|t| t.time == time);
                    let matches_space = guards[i].timeline.iter().any(|t| t.time == time && t.space == space);
                    if has_slot && !matches_space {
                        conflict = true;
                        break;
                    }
                    if !has_slot {
                        cost += size;
                    }
                }
                if conflict {
                    continue;
                }
                if best.map_or(true, |(_, _, c)| cost < c) {
                    best = Some((space, time, cost));
                    if cost == 0 {
                        break;
                    }
                }
            }

            match best {
                Some((space, time, 0)) => break (space, time),
                Some((space, time, _)) if ref_idx + 1 >= deps.len() => break (space, time),
                _ => {
                    // Step 4: try the next-largest DB as reference.
                    let tried: Vec<usize> = vec![ref_idx];
                    let next = (0..deps.len())
                        .filter(|i| !tried.contains(i))
                        .max_by_key(|&i| deps[i].1);
                    match next {
                        Some(next_idx) if next_idx != ref_idx => ref_idx = next_idx,
                        _ => {
                            // Step 5: append a new slot at refTime+1 on the
                            // current reference's space.
                            let ref_space = guards[ref_idx].timeline.back().map(|t| t.space).unwrap_or(self.here);
                            let ref_time = guards[ref_idx].timeline.back().map(|t| t.time).unwrap_or(0);
                            break (ref_space, ref_time + 1);
                        }
                    }
                }
            }
        };

        // Step 6: record the decision on every dep's timeline.
        let mut effects = Vec::new();
        for guard in guards.iter_mut() {
            let was_head_drained = guard
                .timeline
                .front()
                .map_or(false, |t| t.edt_done_count == t.edt_scheduled_count && t.edt_scheduled_count > 0);
            let slot = guard.ensure_time_slot(chosen.0, chosen.1);
            slot.scheduler_count = Some(slot.scheduler_count.unwrap_or(0) + 1);
            if was_head_drained {
                if let Some(head) = guard.timeline.front_mut() {
                    head.scheduler_done = true;
                }
                effects.push(DbEffect::AnalyzeUpdate {
                    to: chosen.0,
                    db: guard.guid,
                    time: chosen.1,
                });
            }
        }

        Ok((chosen, effects))
    }
}

impl Heuristic for St {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::St
    }

    fn get_work(&self, worker: usize) -> SchedulerResult<Option<Guid>> {
        if let Some(edt) = self.wst.worker(worker).and_then(|d| d.pop()) {
            return Ok(Some(edt));
        }
        Ok(self.wst.steal_from_any(worker))
    }

    fn notify(
        &self,
        kind: NotifyKind,
        edt: Option<Guid>,
        _db: Option<Guid>,
    ) -> SchedulerResult<Vec<PolicyMessage>> {
        match kind {
            NotifyKind::EdtReady => {
                if let Some(edt) = edt {
                    let _ = self.wst.push_to(0, edt);
                }
                Ok(Vec::new())
            }
            _ => Ok(Vec::new()),
        }
    }

    fn analyze(
        &self,
        kind: AnalyzeKind,
        property: AnalyzeProperty,
        edt: Option<Guid>,
        db: Option<Guid>,
    ) -> SchedulerResult<Vec<PolicyMessage>> {
        if !self.is_scheduler() {
            // Non-scheduler PDs forward every analysis request upward.
            return Ok(vec![PolicyMessage::new(
                self.here,
                self.scheduler_location,
                true,
                0,
                MessageKind::SchedAnalyze {
                    kind,
                    property,
                    db,
                    edt,
                    space: None,
                    time: None,
                },
            )]);
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(n: u32) -> Location {
        Location(n)
    }

    #[test]
    fn single_pd_short_circuits_to_time_one() {
        let st = St::new(loc(0), loc(0), 0, 1);
        let ((space, time), effects) = st.place_edt(&[(Guid(1), 64)]).unwrap();
        assert_eq!((space, time), (loc(0), 1));
        assert!(effects.is_empty());
    }

    #[test]
    fn no_deps_round_robins_across_neighbours() {
        let st = St::new(loc(0), loc(0), 1, 1);
        let (first, _) = st.place_edt(&[]).unwrap();
        let (second, _) = st.place_edt(&[]).unwrap();
        assert_ne!(first.0, second.0);
    }

    #[test]
    fn zero_conflict_slot_is_chosen_when_already_present() {
        let st = St::new(loc(0), loc(0), 1, 1);
        st.db_at_scheduler(Guid(1), 64, loc(0), 1);
        st.db_at_scheduler(Guid(2), 32, loc(0), 1);

        let ((space, time), _) = st.place_edt(&[(Guid(1), 64), (Guid(2), 32)]).unwrap();
        assert_eq!((space, time), (loc(0), 1));
    }

    #[test]
    fn db_create_then_acquire_release_round_trip() {
        let st = St::new(loc(0), loc(0), 0, 1);
        let effects = st.db_create(Guid(1), 64, Some(0xabc), 1);
        assert!(effects.is_empty());
        st.db_acquire(Guid(1)).unwrap();
        st.db_release(Guid(1)).unwrap();
    }
}
