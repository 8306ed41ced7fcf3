//! `hc`: the baseline work-stealing heuristic (section 4.3).
//!
//! Per PD, owns a [`Wst`] of one deque per worker. A worker first tries its
//! own deque, then the last deque it successfully stole from (the cached
//! victim), then sweeps every deque round-robin until the whole root is
//! empty.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::container::Wst;
use crate::error::SchedulerResult;
use crate::guid::Guid;
use crate::message::{MessageKind, NotifyKind, PolicyMessage};
use crate::transport::Location;

use super::{Heuristic, HeuristicKind};

pub struct Hc {
    wst: Wst<Guid>,
    /// One cached last-successful-victim index per worker (section 4.3:
    /// "on empty, retry the last victim deque").
    last_victim: Vec<AtomicUsize>,
    here: Location,
}

const NO_VICTIM: usize = usize::MAX;

impl Hc {
    pub fn new(worker_count: usize, here: Location) -> Self {
        Self {
            wst: Wst::new(worker_count, false),
            last_victim: (0..worker_count).map(|_| AtomicUsize::new(NO_VICTIM)).collect(),
            here,
        }
    }

    pub fn wst(&self) -> &Wst<Guid> {
        &self.wst
    }

    fn pop_own(&self, worker: usize) -> Option<Guid> {
        self.wst.worker(worker).and_then(|d| d.pop())
    }

    fn try_cached_victim(&self, worker: usize) -> Option<Guid> {
        let victim = self.last_victim.get(worker)?.load(Ordering::Relaxed);
        if victim == NO_VICTIM {
            return None;
        }
        self.wst.worker(victim).and_then(|d| d.steal())
    }

    fn sweep(&self, worker: usize) -> Option<Guid> {
        let n = self.wst.worker_count();
        for offset in 0..n {
            let idx = (worker + offset) % n;
            if let Some(item) = self.wst.worker(idx).and_then(|d| d.steal()) {
                if let Some(cache) = self.last_victim.get(worker) {
                    cache.store(idx, Ordering::Relaxed);
                }
                return Some(item);
            }
        }
        None
    }

    /// Push a ready EDT, honouring an `edt-space` worker hint when present.
    pub fn push_ready(&self, caller_worker: usize, space_hint: Option<usize>, edt: Guid) {
        let target = space_hint.unwrap_or(caller_worker);
        let target = target.min(self.wst.worker_count().saturating_sub(1));
        let _ = self.wst.push_to(target, edt);
    }
}

impl Heuristic for Hc {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Hc
    }

    fn get_work(&self, worker: usize) -> SchedulerResult<Option<Guid>> {
        if let Some(edt) = self.pop_own(worker) {
            return Ok(Some(edt));
        }
        if let Some(edt) = self.try_cached_victim(worker) {
            return Ok(Some(edt));
        }
        Ok(self.sweep(worker))
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
                    self.push_ready(0, None, edt);
                }
                Ok(Vec::new())
            }
            NotifyKind::EdtDone => {
                let edt = edt.ok_or_else(|| {
                    crate::error::SchedulerError::InvalidArgument("edt-done needs an edt guid".into())
                })?;
                Ok(vec![PolicyMessage::new(
                    self.here,
                    self.here,
                    false,
                    0,
                    MessageKind::WorkDestroy(edt),
                )])
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_prefers_own_deque() {
        let hc = Hc::new(2, Location(0));
        hc.push_ready(0, None, Guid(1));
        assert_eq!(hc.get_work(0).unwrap(), Some(Guid(1)));
    }

    #[test]
    fn idle_worker_steals_then_caches_victim() {
        let hc = Hc::new(3, Location(0));
        hc.push_ready(2, None, Guid(9));
        assert_eq!(hc.get_work(0).unwrap(), Some(Guid(9)));
        assert_eq!(hc.last_victim[0].load(Ordering::Relaxed), 2);
    }

    #[test]
    fn edt_done_emits_work_destroy() {
        let hc = Hc::new(1, Location(0));
        let msgs = hc.notify(NotifyKind::EdtDone, Some(Guid(3)), None).unwrap();
        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0].kind, MessageKind::WorkDestroy(g) if g == Guid(3)));
    }
}
