//! EDT (Event-Driven Task) data model.
//!
//! An EDT is a fire-once procedure with a fixed slot count and a fixed
//! number of DB dependences; it becomes runnable only when every slot is
//! satisfied and every DB dependence is locally acquired in a compatible
//! mode (section 3). The function body itself is out of scope (section 1
//! names the EDT invocation ABI as a collaborator) — this crate stores it as
//! an opaque handle.

use crate::guid::Guid;
use crate::hint::EdtHint;
use crate::transport::Location;

/// Access mode requested for a DB dependence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only.
    Ro,
    /// Read-write, exclusive.
    Rw,
    /// Write-only (no read of prior contents required).
    Wo,
}

impl AccessMode {
    /// Whether two modes held concurrently on the same DB are compatible.
    pub fn compatible_with(self, other: AccessMode) -> bool {
        matches!((self, other), (AccessMode::Ro, AccessMode::Ro))
    }
}

/// One entry of an EDT's resolved-dependence vector.
#[derive(Debug, Clone, PartialEq)]
pub struct DepSlot {
    /// The DB this slot depends on, once known. `None` until the slot is
    /// added (an EDT can be created with DB dependences added later).
    pub db: Option<Guid>,
    /// Access mode requested for this slot.
    pub mode: AccessMode,
    /// Local pointer, populated only after the DB is acquired for this slot.
    pub ptr: Option<u64>,
}

impl DepSlot {
    pub fn unresolved(mode: AccessMode) -> Self {
        Self {
            db: None,
            mode,
            ptr: None,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.db.is_some()
    }

    pub fn is_acquired(&self) -> bool {
        self.ptr.is_some()
    }
}

/// Lifecycle state of an EDT (section 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdtState {
    Created,
    AllDepsAdded,
    Partial,
    AllSatisfied,
    AllAcquired,
    Running,
    Reaping,
    Rescheduled,
}

bitflags::bitflags! {
    /// Flags carried by an EDT (section 3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EdtFlags: u8 {
        const USES_HINTS           = 0b0001;
        const RUNTIME_EDT          = 0b0010;
        const USES_SCHEDULER_OBJECT = 0b0100;
        const USES_AFFINITY        = 0b1000;
    }
}

/// An Event-Driven Task.
#[derive(Debug, Clone, PartialEq)]
pub struct Edt {
    pub guid: Guid,
    pub template_guid: Guid,
    pub param_count: u32,
    pub params: Vec<u64>,
    pub deps: Vec<DepSlot>,
    pub state: EdtState,
    pub flags: EdtFlags,
    pub hint: EdtHint,
    /// Location this EDT currently resides on, or is scheduled to move to.
    pub location: Location,
    /// Runtime-assigned scheduled (space, time) from ST placement, if any.
    pub scheduled: Option<(Location, u64)>,
}

impl Edt {
    pub fn new(guid: Guid, template_guid: Guid, param_count: u32, dep_count: u32) -> Self {
        Self {
            guid,
            template_guid,
            param_count,
            params: vec![0; param_count as usize],
            deps: (0..dep_count)
                .map(|_| DepSlot::unresolved(AccessMode::Rw))
                .collect(),
            state: EdtState::Created,
            flags: EdtFlags::empty(),
            hint: EdtHint::new(),
            location: Location::UNKNOWN,
            scheduled: None,
        }
    }

    /// Whether every dependence slot both names a DB and has been locally
    /// acquired — the precondition to run (section 3).
    pub fn is_runnable(&self) -> bool {
        self.state == EdtState::AllAcquired
            && self.deps.iter().all(|d| d.is_satisfied() && d.is_acquired())
    }

    /// Recompute `state` from the dependence vector. Called after any
    /// `satisfy`/`acquire` mutation.
    pub fn recompute_state(&mut self) {
        if self.state == EdtState::Running
            || self.state == EdtState::Reaping
            || self.state == EdtState::Rescheduled
        {
            return;
        }

        let all_deps_added = self.deps.iter().all(|d| d.db.is_some()) || self.deps.is_empty();
        let all_satisfied = all_deps_added;
        let all_acquired = self.deps.iter().all(|d| d.is_acquired());

        self.state = if !all_deps_added {
            if self.deps.iter().any(|d| d.db.is_some()) {
                EdtState::Partial
            } else {
                EdtState::Created
            }
        } else if all_acquired {
            EdtState::AllAcquired
        } else if all_satisfied {
            EdtState::AllSatisfied
        } else {
            EdtState::AllDepsAdded
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guid(n: u64) -> Guid {
        Guid(n)
    }

    #[test]
    fn edt_with_no_deps_starts_created_and_becomes_runnable_once_acquired() {
        let mut edt = Edt::new(guid(1), guid(100), 0, 0);
        assert_eq!(edt.state, EdtState::Created);
        edt.recompute_state();
        assert_eq!(edt.state, EdtState::AllAcquired);
        assert!(edt.is_runnable());
    }

    #[test]
    fn edt_is_not_runnable_until_every_slot_satisfied_and_acquired() {
        let mut edt = Edt::new(guid(1), guid(100), 0, 2);
        edt.recompute_state();
        assert_eq!(edt.state, EdtState::Created);
        assert!(!edt.is_runnable());

        edt.deps[0].db = Some(guid(10));
        edt.recompute_state();
        assert_eq!(edt.state, EdtState::Partial);

        edt.deps[1].db = Some(guid(11));
        edt.recompute_state();
        assert_eq!(edt.state, EdtState::AllSatisfied);
        assert!(!edt.is_runnable());

        edt.deps[0].ptr = Some(0xdead);
        edt.deps[1].ptr = Some(0xbeef);
        edt.recompute_state();
        assert_eq!(edt.state, EdtState::AllAcquired);
        assert!(edt.is_runnable());
    }
}
