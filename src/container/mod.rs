//! Scheduler-object containers.
//!
//! Every container kind implements the same uniform contract (section 4.2):
//! insert / remove / count / iterate, plus the location-aware and
//! marshalling operations a subset of containers support. Rust expresses the
//! "one function table shared by several kinds" design as a trait rather
//! than a literal vtable; [`SchedulerObjectKind`] still carries the
//! allocation-provenance tag the original keeps for destruction (Design
//! Notes, section 9), even though this crate destroys everything through
//! `Drop`.

pub mod binheap;
pub mod deque;
pub mod list;
pub mod map;
pub mod pdspace;
pub mod prwsh;
pub mod wst;

pub use binheap::BinHeap;
pub use deque::Deque;
pub use list::List;
pub use map::Map;
pub use pdspace::PdSpace;
pub use prwsh::PrWsh;
pub use wst::Wst;

use crate::error::SchedulerResult;
use crate::transport::Location;

/// Where an insert/remove targets relative to a [`Locator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionKind {
    Before,
    After,
    InPlace,
}

/// What an insert/remove/iterate op is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Head,
    Tail,
    /// An opaque cursor previously returned by `create_iterator`.
    Iterator(usize),
}

/// A full insert/remove target: kind plus locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub kind: PositionKind,
    pub locator: Locator,
}

impl Position {
    pub fn head() -> Self {
        Self { kind: PositionKind::Before, locator: Locator::Head }
    }

    pub fn tail() -> Self {
        Self { kind: PositionKind::After, locator: Locator::Tail }
    }
}

/// How a child container returned by `get_for_location` relates to its
/// parent's placement decision (section 4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    Potential,
    Mapped,
    Unmapped,
    Pinned,
    Released,
    Worker(usize),
}

/// Flags narrowing a `count` call (section 4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountFlags {
    pub immediate: bool,
    pub recursive: bool,
    pub only_edt: bool,
    pub only_db: bool,
}

impl CountFlags {
    pub fn immediate() -> Self {
        Self { immediate: true, ..Default::default() }
    }

    pub fn recursive_edt() -> Self {
        Self { recursive: true, only_edt: true, ..Default::default() }
    }
}

/// The allocation-provenance tag the original runtime packs into its
/// container kind byte, kept for parity with the Design Notes but unused by
/// Rust's ownership-driven destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerObjectKind {
    Deque,
    List,
    Map,
    BinHeap,
    Wst,
    PdSpace,
    PrWsh,
    DbSpace,
    DbTime,
}

/// The uniform contract every scheduler-object container implements
/// (section 4.2). Default bodies return [`crate::error::SchedulerError::NotSupported`]
/// for operations that don't apply to a given container (e.g. `get_for_location`
/// on a flat `Map`), matching the original's factory tables where not every
/// kind fills in every slot.
pub trait SchedulerObject {
    type Item;

    fn kind(&self) -> SchedulerObjectKind;

    /// Insert `item` at `position`.
    fn insert(&mut self, position: Position, item: Self::Item) -> SchedulerResult<()>;

    /// Remove and return the item at `position`, if any.
    fn remove(&mut self, position: Position) -> SchedulerResult<Option<Self::Item>>;

    /// Count items matching `flags`.
    fn count(&self, flags: CountFlags) -> usize;

    /// Descend into a child container bound to `loc` under `mapping`. Only
    /// `Wst` and `PdSpace` meaningfully implement this (section 4.2).
    fn get_for_location(&self, _loc: Location, _mapping: Mapping) -> SchedulerResult<()> {
        Err(crate::error::SchedulerError::NotSupported(
            "get_for_location".into(),
        ))
    }
}
