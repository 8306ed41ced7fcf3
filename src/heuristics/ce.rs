//! `ce`: hierarchical pending-request scheduling for a node with one
//! Control Engine (CE) and eight Execution Engines (XEs) (section 4.8).
//!
//! One [`Context`] exists per XE and per neighbour CE. `get_work` tries the
//! caller's own context, then sweeps the others; if nothing is found the
//! request is parked (`in_work_request_pending`) rather than returned as a
//! failure, so `update_idle` can later satisfy it or escalate to the
//! parent.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::container::Deque;
use crate::edt::{Edt, EdtFlags};
use crate::error::SchedulerResult;
use crate::guid::Guid;
use crate::hint::EdtProperty;
use crate::message::{MessageKind, NotifyKind, PolicyMessage};
use crate::transport::Location;

use super::{Heuristic, HeuristicKind};

pub struct Context {
    pub location: Location,
    deque: Deque<Guid>,
    /// Cached index of the last context this one successfully stole from.
    steal_index: AtomicUsize,
    in_work_request_pending: AtomicBool,
    out_work_request_pending: AtomicBool,
    msg_id: AtomicU64,
    can_accept_work_request: AtomicBool,
    pub is_child: bool,
}

const NO_VICTIM: usize = usize::MAX;

impl Context {
    pub fn new(location: Location, is_child: bool) -> Self {
        Self {
            location,
            deque: Deque::new(),
            steal_index: AtomicUsize::new(NO_VICTIM),
            in_work_request_pending: AtomicBool::new(false),
            out_work_request_pending: AtomicBool::new(false),
            msg_id: AtomicU64::new(0),
            can_accept_work_request: AtomicBool::new(true),
            is_child,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_work_request_pending.load(Ordering::Relaxed)
    }
}

pub struct Ce {
    contexts: Vec<Context>,
    /// Index of this node's own (local CE) context within `contexts`.
    local: usize,
    parent: Option<usize>,
    shutdown_mode: AtomicBool,
    here: Location,
}

impl Ce {
    /// `xe_locations` are the eight (or fewer, for tests) execution
    /// engines; `neighbours` are sibling CE locations; `parent` (if any) is
    /// always asserted alive per section 4.8's failure semantics.
    pub fn new(here: Location, xe_locations: Vec<Location>, neighbours: Vec<Location>, parent: Option<Location>) -> Self {
        let mut contexts: Vec<Context> = xe_locations.into_iter().map(|l| Context::new(l, true)).collect();
        let local = contexts.len();
        contexts.push(Context::new(here, false));

        let mut parent_idx = None;
        for n in neighbours {
            contexts.push(Context::new(n, false));
        }
        if let Some(p) = parent {
            parent_idx = Some(contexts.len());
            contexts.push(Context::new(p, false));
        }

        Self {
            contexts,
            local,
            parent: parent_idx,
            shutdown_mode: AtomicBool::new(false),
            here,
        }
    }

    pub fn context(&self, idx: usize) -> Option<&Context> {
        self.contexts.get(idx)
    }

    pub fn local_index(&self) -> usize {
        self.local
    }

    fn sweep_others(&self, skip: usize) -> Option<(usize, Guid)> {
        for (idx, ctx) in self.contexts.iter().enumerate() {
            if idx == skip {
                continue;
            }
            if let Some(edt) = ctx.deque.steal() {
                self.contexts[skip].steal_index.store(idx, Ordering::Relaxed);
                return Some((idx, edt));
            }
        }
        None
    }

    /// `get_work`: the caller's own deque, then a sweep. On total failure,
    /// parks the request and returns `None` — a real runtime blocks the
    /// caller here; this crate leaves blocking to the caller.
    pub fn request_work(&self, requester: usize) -> SchedulerResult<Option<Guid>> {
        if self.shutdown_mode.load(Ordering::Relaxed) {
            return Ok(None);
        }
        let ctx = self
            .contexts
            .get(requester)
            .ok_or_else(|| crate::error::SchedulerError::InvalidArgument(format!("no context {requester}")))?;

        if let Some(edt) = ctx.deque.pop() {
            return Ok(Some(edt));
        }

        let cached = ctx.steal_index.load(Ordering::Relaxed);
        if cached != NO_VICTIM {
            if let Some(victim) = self.contexts.get(cached) {
                if let Some(edt) = victim.deque.steal() {
                    return Ok(Some(edt));
                }
            }
        }

        if let Some((_, edt)) = self.sweep_others(requester) {
            return Ok(Some(edt));
        }
        ctx.in_work_request_pending.store(true, Ordering::Relaxed);
        Ok(None)
    }

    /// `notify(edt-ready)`: place using the `slot-max-access` hint when it
    /// names a location with a context here, else the local CE's deque.
    pub fn push_ready(&self, edt: &Edt) {
        let target = edt
            .hint
            .get_u64(EdtProperty::SlotMaxAccess)
            .ok()
            .and_then(|loc| self.contexts.get(loc as usize))
            .unwrap_or(&self.contexts[self.local]);
        target.deque.push(edt.guid);
    }

    /// `update(idle)`: satisfy pending XEs first, then pending neighbour
    /// CEs; if local work is exhausted but XEs remain pending, force a work
    /// request to the parent; then round-robin out-requests to neighbours
    /// still accepting them.
    pub fn update_idle(&self) -> Vec<PolicyMessage> {
        let mut messages = Vec::new();

        for idx in 0..self.contexts.len() {
            if !self.contexts[idx].is_pending() {
                continue;
            }
            if let Some((_, edt)) = self.sweep_others(idx) {
                self.contexts[idx].deque.push(edt);
                self.contexts[idx].in_work_request_pending.store(false, Ordering::Relaxed);
            }
        }

        let any_xe_pending = self.contexts[..self.local].iter().any(Context::is_pending);
        if any_xe_pending {
            if let Some(parent_idx) = self.parent {
                let parent = &self.contexts[parent_idx];
                if !parent.out_work_request_pending.swap(true, Ordering::Relaxed) {
                    let id = parent.msg_id.fetch_add(1, Ordering::Relaxed);
                    messages.push(PolicyMessage::new(
                        self.here,
                        parent.location,
                        true,
                        id,
                        MessageKind::SchedGetWork,
                    ));
                }
            }
        }

        for (idx, ctx) in self.contexts.iter().enumerate() {
            if idx == self.local || Some(idx) == self.parent || ctx.is_child {
                continue;
            }
            if ctx.can_accept_work_request.load(Ordering::Relaxed)
                && !ctx.out_work_request_pending.swap(true, Ordering::Relaxed)
            {
                let id = ctx.msg_id.fetch_add(1, Ordering::Relaxed);
                messages.push(PolicyMessage::new(self.here, ctx.location, true, id, MessageKind::SchedGetWork));
            }
        }

        messages
    }

    /// `update(shutdown)`: null-reply every pending child, then every other
    /// pending location, then refuse all further acceptance.
    pub fn update_shutdown(&self) -> Vec<PolicyMessage> {
        let mut messages = Vec::new();
        let mut send_null = |ctx: &Context| {
            if ctx.is_pending() {
                messages.push(PolicyMessage::noop(self.here, ctx.location));
            }
        };
        for ctx in self.contexts.iter().filter(|c| c.is_child) {
            send_null(ctx);
        }
        for ctx in self.contexts.iter().filter(|c| !c.is_child) {
            send_null(ctx);
        }
        self.shutdown_mode.store(true, Ordering::Relaxed);
        messages
    }

    /// A neighbour reported `location-dead`: permanently refuse further
    /// work requests to it. The parent is asserted alive and is never
    /// marked dead (section 4.8).
    pub fn mark_dead(&self, idx: usize) {
        if Some(idx) == self.parent {
            return;
        }
        if let Some(ctx) = self.contexts.get(idx) {
            ctx.can_accept_work_request.store(false, Ordering::Relaxed);
        }
    }
}

impl Heuristic for Ce {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Ce
    }

    fn get_work(&self, worker: usize) -> SchedulerResult<Option<Guid>> {
        self.request_work(worker)
    }

    fn notify(
        &self,
        kind: NotifyKind,
        edt: Option<Guid>,
        _db: Option<Guid>,
    ) -> SchedulerResult<Vec<PolicyMessage>> {
        if kind == NotifyKind::EdtReady {
            if let Some(guid) = edt {
                let mut placeholder = Edt::new(guid, guid, 0, 0);
                placeholder.flags = EdtFlags::empty();
                self.push_ready(&placeholder);
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locs(n: u32) -> Vec<Location> {
        (0..n).map(Location).collect()
    }

    #[test]
    fn xe_steals_from_sibling_before_parking() {
        let ce = Ce::new(Location(100), locs(2), vec![], None);
        ce.contexts[1].deque.push(Guid(5));
        assert_eq!(ce.request_work(0).unwrap(), Some(Guid(5)));
    }

    #[test]
    fn exhausted_xe_parks_and_idle_tick_forces_parent_request() {
        let ce = Ce::new(Location(100), locs(1), vec![], Some(Location(200)));
        assert_eq!(ce.request_work(0).unwrap(), None);
        assert!(ce.context(0).unwrap().is_pending());

        let msgs = ce.update_idle();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].dest, Location(200));
    }

    #[test]
    fn dead_neighbour_stops_receiving_requests_but_parent_is_immune() {
        let ce = Ce::new(Location(100), locs(1), vec![Location(300)], Some(Location(200)));
        let neighbour_idx = ce.local_index() + 1;
        let parent_idx = ce.parent.unwrap();

        ce.mark_dead(neighbour_idx);
        ce.mark_dead(parent_idx);

        assert!(!ce.context(neighbour_idx).unwrap().can_accept_work_request.load(Ordering::Relaxed));
        assert!(ce.context(parent_idx).unwrap().can_accept_work_request.load(Ordering::Relaxed));
    }

    #[test]
    fn shutdown_null_replies_children_first() {
        let ce = Ce::new(Location(100), locs(1), vec![], None);
        let _ = ce.request_work(0);
        let msgs = ce.update_shutdown();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].dest, Location(0));
    }
}
