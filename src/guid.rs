//! GUID identity for EDTs and DBs.
//!
//! GUID provider internals (global uniqueness across PDs, allocation
//! policy) are a named collaborator, not part of the core (section 1).
//! This module keeps only what the core actually touches: an opaque,
//! cheaply-copyable identifier that waitlists and scheduler objects can
//! store as a handle instead of a raw reference (Design Notes, section 9:
//! "cyclic metadata graphs become an arena-plus-index model").

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque identifier for an EDT or a DB.
///
/// Uniqueness is a property of the allocator that minted it, not of the
/// value itself; a `Guid` from one kind of object is never compared against
/// a `Guid` from another by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Guid(pub u64);

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guid:{:016x}", self.0)
    }
}

/// Monotonic, process-local GUID allocator.
///
/// Not a faithful stand-in for a distributed GUID provider (which must
/// guarantee global uniqueness across PDs) — it exists so tests can mint
/// GUIDs without depending on a real provider, which stays out of scope
/// for this crate.
#[derive(Debug, Default)]
pub struct GuidAllocator {
    next: AtomicU64,
}

impl GuidAllocator {
    /// Create an allocator starting from 1 (0 is reserved as "no GUID").
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Mint a fresh, allocator-unique GUID.
    pub fn allocate(&self) -> Guid {
        Guid(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_never_repeats() {
        let alloc = GuidAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a, b);
    }
}
