//! The DB lifecycle: metadata, placement timeline, and the state machine
//! that moves a DB between PDs.
//!
//! The core does not own DB *storage* (section 1's non-goals) — `ptr` here
//! is an opaque local handle the runtime's allocator would fill in, never
//! dereferenced by this crate.

mod proxy;
mod space;

pub use proxy::EdtProxy;
pub use space::{DbEffect, DbSpace, DbSpaceState, DbTime};

use crate::edt::AccessMode;
use crate::guid::Guid;
use crate::hint::DbHint;
use crate::transport::Location;

/// A data block's home-independent identity and metadata (section 3).
#[derive(Debug, Clone, PartialEq)]
pub struct Db {
    pub guid: Guid,
    pub size: u64,
    pub home: Location,
    pub mode: AccessMode,
    pub hint: DbHint,
}

impl Db {
    pub fn new(guid: Guid, size: u64, home: Location, mode: AccessMode) -> Self {
        Self {
            guid,
            size,
            home,
            mode,
            hint: DbHint::new(),
        }
    }
}
