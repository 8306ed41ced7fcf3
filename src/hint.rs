//! Hint objects: advisory metadata attached to EDTs and DBs.
//!
//! Mirrors `ocr-runtime-hints.h`'s packed-mask design: a bitmap tracks
//! which properties are set, and a parallel value array holds the raw
//! bits. Each property is stored as a `u64`; typed
//! accessors reinterpret those bits for properties that aren't naturally
//! unsigned (`priority` is `s64`, `disperse` is an enum).
//!
//! Hints never affect correctness — every heuristic that reads one must
//! have a defined behaviour for "hint absent."

use crate::error::{SchedulerError, SchedulerResult};

/// Scope a disperse hint is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disperse {
    /// Disperse among workers in the local PD only.
    Near,
    /// Disperse across the whole platform-affinity table.
    Any,
}

impl Disperse {
    fn to_raw(self) -> u64 {
        match self {
            Disperse::Near => 0,
            Disperse::Any => 1,
        }
    }

    fn from_raw(raw: u64) -> Self {
        if raw == 0 {
            Disperse::Near
        } else {
            Disperse::Any
        }
    }
}

/// Properties recognised on an EDT hint block (section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdtProperty {
    Priority,
    SlotMaxAccess,
    Affinity,
    Space,
    Time,
    Disperse,
    Phase,
}

impl EdtProperty {
    const COUNT: usize = 7;

    fn index(self) -> usize {
        match self {
            EdtProperty::Priority => 0,
            EdtProperty::SlotMaxAccess => 1,
            EdtProperty::Affinity => 2,
            EdtProperty::Space => 3,
            EdtProperty::Time => 4,
            EdtProperty::Disperse => 5,
            EdtProperty::Phase => 6,
        }
    }
}

/// Properties recognised on a DB hint block (section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbProperty {
    Affinity,
    Near,
    Inter,
    Far,
    HighBandwidth,
}

impl DbProperty {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            DbProperty::Affinity => 0,
            DbProperty::Near => 1,
            DbProperty::Inter => 2,
            DbProperty::Far => 3,
            DbProperty::HighBandwidth => 4,
        }
    }
}

/// Shared bitmap-plus-value-array storage, type-tagged by `N` at
/// construction the way the original packs a type id into the mask.
#[derive(Debug, Clone, PartialEq)]
struct RawHintSet<const N: usize> {
    prop_mask: u64,
    values: [u64; N],
}

impl<const N: usize> Default for RawHintSet<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RawHintSet<N> {
    fn new() -> Self {
        Self {
            prop_mask: 0,
            values: [0; N],
        }
    }

    fn set(&mut self, index: usize, raw: u64) {
        self.values[index] = raw;
        self.prop_mask |= 1 << index;
    }

    fn get(&self, index: usize) -> Option<u64> {
        if self.prop_mask & (1 << index) != 0 {
            Some(self.values[index])
        } else {
            None
        }
    }

    fn unset(&mut self, index: usize) {
        self.prop_mask &= !(1 << index);
        self.values[index] = 0;
    }

    fn size(&self) -> u32 {
        self.prop_mask.count_ones()
    }
}

/// Hint block attached to an EDT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdtHint {
    raw: RawHintSet<{ EdtProperty::COUNT }>,
}

impl EdtHint {
    /// Construct an empty, type-tagged hint block.
    pub fn new() -> Self {
        Self {
            raw: RawHintSet::new(),
        }
    }

    /// Number of properties currently set.
    pub fn size(&self) -> u32 {
        self.raw.size()
    }

    pub fn set_u64(&mut self, prop: EdtProperty, value: u64) -> SchedulerResult<()> {
        if prop == EdtProperty::Priority {
            return Err(SchedulerError::InvalidArgument(
                "priority is signed; use set_priority".into(),
            ));
        }
        if prop == EdtProperty::Disperse {
            return Err(SchedulerError::InvalidArgument(
                "disperse is an enum; use set_disperse".into(),
            ));
        }
        self.raw.set(prop.index(), value);
        Ok(())
    }

    pub fn get_u64(&self, prop: EdtProperty) -> SchedulerResult<u64> {
        self.raw
            .get(prop.index())
            .ok_or_else(|| SchedulerError::NotFound(format!("{prop:?} unset")))
    }

    pub fn set_priority(&mut self, value: i64) {
        self.raw.set(EdtProperty::Priority.index(), value as u64);
    }

    pub fn get_priority(&self) -> SchedulerResult<i64> {
        self.raw
            .get(EdtProperty::Priority.index())
            .map(|raw| raw as i64)
            .ok_or_else(|| SchedulerError::NotFound("priority unset".into()))
    }

    pub fn set_disperse(&mut self, value: Disperse) {
        self.raw
            .set(EdtProperty::Disperse.index(), value.to_raw());
    }

    pub fn get_disperse(&self) -> SchedulerResult<Disperse> {
        self.raw
            .get(EdtProperty::Disperse.index())
            .map(Disperse::from_raw)
            .ok_or_else(|| SchedulerError::NotFound("disperse unset".into()))
    }

    pub fn unset(&mut self, prop: EdtProperty) {
        self.raw.unset(prop.index());
    }

    pub fn is_set(&self, prop: EdtProperty) -> bool {
        self.raw.get(prop.index()).is_some()
    }
}

/// Hint block attached to a DB.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbHint {
    raw: RawHintSet<{ DbProperty::COUNT }>,
}

impl DbHint {
    pub fn new() -> Self {
        Self {
            raw: RawHintSet::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.raw.size()
    }

    pub fn set_u64(&mut self, prop: DbProperty, value: u64) {
        self.raw.set(prop.index(), value);
    }

    pub fn get_u64(&self, prop: DbProperty) -> SchedulerResult<u64> {
        self.raw
            .get(prop.index())
            .ok_or_else(|| SchedulerError::NotFound(format!("{prop:?} unset")))
    }

    pub fn unset(&mut self, prop: DbProperty) {
        self.raw.unset(prop.index());
    }

    pub fn is_set(&self, prop: DbProperty) -> bool {
        self.raw.get(prop.index()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_set_get_round_trips() {
        let mut hint = EdtHint::new();
        hint.set_u64(EdtProperty::SlotMaxAccess, 42).unwrap();
        assert_eq!(hint.get_u64(EdtProperty::SlotMaxAccess).unwrap(), 42);
    }

    #[test]
    fn unset_then_get_is_not_found() {
        let mut hint = EdtHint::new();
        hint.set_u64(EdtProperty::Affinity, 7).unwrap();
        hint.unset(EdtProperty::Affinity);
        assert!(matches!(
            hint.get_u64(EdtProperty::Affinity),
            Err(SchedulerError::NotFound(_))
        ));
    }

    #[test]
    fn priority_round_trips_negative_values() {
        let mut hint = EdtHint::new();
        hint.set_priority(-5);
        assert_eq!(hint.get_priority().unwrap(), -5);
    }

    #[test]
    fn disperse_round_trips() {
        let mut hint = EdtHint::new();
        hint.set_disperse(Disperse::Any);
        assert_eq!(hint.get_disperse().unwrap(), Disperse::Any);
    }

    #[test]
    fn size_tracks_set_properties() {
        let mut hint = DbHint::new();
        assert_eq!(hint.size(), 0);
        hint.set_u64(DbProperty::Affinity, 1);
        hint.set_u64(DbProperty::Near, 1);
        assert_eq!(hint.size(), 2);
        hint.unset(DbProperty::Affinity);
        assert_eq!(hint.size(), 1);
    }
}
