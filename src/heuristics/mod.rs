//! Pluggable scheduling policies.
//!
//! Every heuristic answers the same four questions the facade asks
//! (section 4.1): where does a worker's next unit of work come from
//! (`get_work`), what should happen when something changes
//! (`notify`), how does a scheduler object move to another PD
//! (`transact`), and how do two PDs exchange placement analysis
//! without moving an object (`analyze`). Each heuristic below answers
//! a different subset fully and treats the rest as a no-op, mirroring
//! the original's per-kind function tables (section 4.2) rather than
//! forcing every heuristic through identical logic.

pub mod ce;
pub mod hc;
pub mod hc_comm_delegate;
pub mod placement_affinity;
pub mod priority;
pub mod st;
pub mod static_heuristic;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerResult;
use crate::guid::Guid;
use crate::message::{AnalyzeKind, AnalyzeProperty, NotifyKind, PolicyMessage};

/// Tags a heuristic instance the way the facade's heuristic array does
/// (section 4.1: `masterHeuristicId` indexes one of these).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeuristicKind {
    Hc,
    HcCommDelegate,
    Static,
    Priority,
    PlacementAffinity,
    Ce,
    St,
}

/// A unit of work handed back by `get_work`. Most heuristics hand back a
/// runnable EDT; `hc-comm-delegate` hands back a message handle instead
/// (section 4.4) — both are represented as a GUID, since a `CommHandle`
/// is itself identified by one.
pub type WorkItem = Guid;

/// The uniform contract the facade dispatches through (section 4.1).
/// Heuristics for which an operation is meaningless return `Ok(None)` /
/// `Ok(vec![])` rather than an error — silence, not failure, is how the
/// original's per-kind tables represent "not applicable here".
pub trait Heuristic: Send + Sync {
    fn kind(&self) -> HeuristicKind;

    /// Called by a worker asking for its next unit of work. Must not block
    /// except under the CE heuristic (section 4.1).
    fn get_work(&self, worker: usize) -> SchedulerResult<Option<WorkItem>>;

    /// React to a lifecycle event. Returns any messages the caller must
    /// send as a result.
    fn notify(
        &self,
        kind: NotifyKind,
        edt: Option<Guid>,
        db: Option<Guid>,
    ) -> SchedulerResult<Vec<PolicyMessage>>;

    /// Exchange placement analysis with another PD (ST heuristic only;
    /// others ignore it).
    fn analyze(
        &self,
        _kind: AnalyzeKind,
        _property: AnalyzeProperty,
        _edt: Option<Guid>,
        _db: Option<Guid>,
    ) -> SchedulerResult<Vec<PolicyMessage>> {
        Ok(Vec::new())
    }
}
