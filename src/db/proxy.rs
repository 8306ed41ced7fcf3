//! EdtProxy: a parked space/time analysis on the scheduler node.

use crate::edt::DepSlot;
use crate::guid::Guid;
use crate::transport::Location;

/// Created only on the scheduler node when an EDT's placement analysis must
/// suspend because one of its dependence DBs hasn't reported to the
/// scheduler yet (section 3). Lives on the `DbSpace` of the missing DB until
/// that DB's `analyze(create)` arrives and analysis resumes.
#[derive(Debug, Clone)]
pub struct EdtProxy {
    pub edt_guid: Guid,
    pub requester: Location,
    pub deps: Vec<DepSlot>,
    /// Index into `deps` of the dependence that's still missing.
    pub suspend_index: usize,
}

impl EdtProxy {
    pub fn new(edt_guid: Guid, requester: Location, deps: Vec<DepSlot>, suspend_index: usize) -> Self {
        Self {
            edt_guid,
            requester,
            deps,
            suspend_index,
        }
    }

    /// The DB this proxy is still waiting on.
    pub fn blocking_dep(&self) -> Option<Guid> {
        self.deps.get(self.suspend_index).and_then(|d| d.db)
    }
}
