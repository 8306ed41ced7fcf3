//! Scheduler error taxonomy.
//!
//! Error kinds are taxonomised by *condition*, not by the object that raised
//! them (section 7 of the design): every scheduler operation returns one of
//! these variants, and callers propagate it upward unless an explicit
//! recovery path exists. The only recovery paths are dead-neighbour demotion
//! in the CE heuristic and trylock retry in ST placement; every other
//! non-zero return is fatal to the caller's operation.

use crate::transport::Location;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Condition-based error taxonomy for scheduler operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A hint or container API call received an argument it can't act on
    /// (wrong property for a hint's type, a `position` with no matching
    /// `locator`, and similar caller mistakes).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested operation has no implementation for this container or
    /// heuristic kind.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Lookup failed (container search, hint-get on an unset property, GUID
    /// resolution).
    #[error("not found: {0}")]
    NotFound(String),

    /// A structural precondition requiring emptiness was violated (e.g.
    /// destroying a non-drained container).
    #[error("not empty: {0}")]
    NotEmpty(String),

    /// A scheduler object or message referenced a location that isn't part
    /// of the running topology.
    #[error("bad location: {0:?}")]
    BadLocation(Location),

    /// An allocation-backed container could not grow.
    #[error("out of memory")]
    OutOfMemory,

    /// `send_message` failed but the destination might still be reachable;
    /// the caller may retry.
    #[error("transient send failure to {0:?}")]
    TransientSendFailure(Location),

    /// `send_message` reported the destination as permanently gone. The CE
    /// heuristic treats this as its one built-in recovery trigger (mark the
    /// neighbour dead and stop offering it work requests).
    #[error("permanent send failure: {location:?} is dead")]
    PermanentSendFailure {
        /// The location that will no longer be contacted.
        location: Location,
    },

    /// The operation had nothing to do (e.g. `get_work` found no runnable
    /// EDT). Not every call site treats this as an error; heuristics that
    /// model "empty" as a first-class outcome use `Option`/`enum` returns
    /// instead and never produce this variant.
    #[error("no-op")]
    NoOp,

    /// A lock was observed poisoned. Scheduler locks are never expected to
    /// poison (worker panics are caught above the scheduler boundary), so
    /// this is a structural bug, not a status code a caller can act on.
    #[error("poisoned lock: {0}")]
    PoisonedLock(String),

    /// An internal invariant was violated. Timeline monotonicity,
    /// state-machine preconditions, and container contracts are all guarded
    /// by `assert!`/`debug_assert!` at the point of violation; this variant
    /// exists so that the handful of invariant checks that must survive in
    /// release builds (acquire against a PD that doesn't hold the DB,
    /// `analyze(response)` for an unknown request) can still surface as a
    /// typed error instead of a panic.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// Whether the failure leaves room for the caller's own recovery path
    /// (trylock retry, dead-neighbour demotion) rather than being fatal to
    /// the operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SchedulerError::TransientSendFailure(_) | SchedulerError::NoOp
        )
    }

    /// Whether this error should flip a CE neighbour's
    /// `canAcceptWorkRequest` to false per section 4.9's failure semantics.
    pub fn is_permanent_send_failure(&self) -> bool {
        matches!(self, SchedulerError::PermanentSendFailure { .. })
    }
}
