//! `priority`: a single locked bin-heap keyed by the EDT's `priority` hint
//! (section 4.6).

use crate::container::PrWsh;
use crate::edt::Edt;
use crate::error::SchedulerResult;
use crate::guid::Guid;
use crate::message::{NotifyKind, PolicyMessage};

use super::{Heuristic, HeuristicKind};

pub struct Priority {
    ready: PrWsh,
}

impl Priority {
    pub fn new() -> Self {
        Self { ready: PrWsh::new() }
    }

    /// `notify(edt-ready)`: push with the EDT's priority hint (defaulting
    /// to zero when unset).
    pub fn push_ready(&self, edt: &Edt) {
        let priority = edt.hint.get_priority().unwrap_or(0);
        self.ready.push(priority, edt.guid);
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::new()
    }
}

impl Heuristic for Priority {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Priority
    }

    fn get_work(&self, _worker: usize) -> SchedulerResult<Option<Guid>> {
        Ok(self.ready.pop_highest())
    }

    fn notify(
        &self,
        kind: NotifyKind,
        edt: Option<Guid>,
        _db: Option<Guid>,
    ) -> SchedulerResult<Vec<PolicyMessage>> {
        // `edt-ready` needs the EDT's priority hint, not just its guid, so
        // real callers use `push_ready` directly; everything else
        // (including `edt-done`'s implicit destroy) is a no-op here.
        let _ = (kind, edt);
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::Guid as G;

    #[test]
    fn get_work_returns_highest_priority_ready_edt() {
        let p = Priority::new();
        let mut low = Edt::new(G(1), G(100), 0, 0);
        low.hint.set_priority(1);
        let mut high = Edt::new(G(2), G(100), 0, 0);
        high.hint.set_priority(10);

        p.push_ready(&low);
        p.push_ready(&high);

        assert_eq!(p.get_work(0).unwrap(), Some(G(2)));
        assert_eq!(p.get_work(0).unwrap(), Some(G(1)));
    }
}
