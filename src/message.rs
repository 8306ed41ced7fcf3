//! Policy messages: the wire-level vocabulary the scheduler core consumes
//! (section 6). The actual bytes-on-the-wire concern (serialization,
//! retries) belongs to the named-collaborator message transport; this module
//! defines the message shapes the core's facade dispatches on.

use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::edt::Edt;
use crate::guid::Guid;
use crate::transport::Location;

/// Kind of notification delivered through `notify` (section 4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyKind {
    PreProcessMsg,
    PostProcessMsg,
    EdtCreate,
    EdtSatisfied,
    EdtReady,
    EdtDone,
    DbCreate,
    DbAcquire,
    DbRelease,
    DbDestroy,
    CommReady,
}

/// Properties carried on an `analyze` exchange (section 4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzeProperty {
    Create,
    Destroy,
    Request,
    Response,
    Done,
    Update,
    Ack,
    Nack,
}

/// The two kinds of lightweight analysis the ST heuristic exchanges between
/// PDs (section 4.1): no scheduler object travels with either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzeKind {
    SpacetimeEdt,
    SpacetimeDb,
}

/// Scheduler object kinds a `transact` can move (section 4.1/6).
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerObjectPayload {
    Edt(Edt),
    Db {
        db: Db,
        /// Appended raw bytes, present only when the DB's mapping isn't
        /// `released` (section 6, "DB transport").
        bytes: Option<Vec<u8>>,
    },
}

/// Top-level policy message types consumed by the core (section 6).
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    SchedGetWork,
    SchedNotify {
        kind: NotifyKind,
        edt: Option<Guid>,
        db: Option<Guid>,
    },
    SchedTransact(SchedulerObjectPayload),
    SchedAnalyze {
        kind: AnalyzeKind,
        property: AnalyzeProperty,
        db: Option<Guid>,
        edt: Option<Guid>,
        space: Option<Location>,
        time: Option<u64>,
    },
    HintSet,
    HintGet,
    WorkCreate(Edt),
    WorkDestroy(Guid),
    DbCreate(Db),
    DbAcquire(Guid),
    DbRelease(Guid),
    DbFree(Guid),
    /// Used only by tests and the in-memory transport to exercise delivery
    /// without driving real scheduler state.
    Noop,
}

/// Every message carries source/destination, a request/response flag, and a
/// message-id the CE heuristic uses to pair replies (section 6).
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyMessage {
    pub source: Location,
    pub dest: Location,
    pub is_request: bool,
    pub msg_id: u64,
    pub kind: MessageKind,
}

impl PolicyMessage {
    pub fn new(source: Location, dest: Location, is_request: bool, msg_id: u64, kind: MessageKind) -> Self {
        Self {
            source,
            dest,
            is_request,
            msg_id,
            kind,
        }
    }

    /// A content-free message used by transport-layer tests.
    pub fn noop(source: Location, dest: Location) -> Self {
        Self::new(source, dest, true, 0, MessageKind::Noop)
    }
}
