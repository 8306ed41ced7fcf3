//! Runlevel protocol (section 6).
//!
//! Every factory and heuristic tolerates being asked to switch runlevel
//! concurrently with ordinary work, but only within the phases it declares
//! itself capable of (section 6: "only within the phases they were declared
//! capable of"). This module models the levels, the bring-up/tear-down
//! direction, and the property bitfield; `RunlevelSwitch` is what a
//! `switch_runlevel` callback receives.

use bitflags::bitflags;

/// Ordered runlevels a PD (and every factory within it) passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Runlevel {
    ConfigParse,
    NetworkOk,
    PdOk,
    MemoryOk,
    GuidOk,
    ComputeOk,
    UserOk,
}

impl Runlevel {
    pub const ALL: [Runlevel; 7] = [
        Runlevel::ConfigParse,
        Runlevel::NetworkOk,
        Runlevel::PdOk,
        Runlevel::MemoryOk,
        Runlevel::GuidOk,
        Runlevel::ComputeOk,
        Runlevel::UserOk,
    ];

    pub fn next(self) -> Option<Runlevel> {
        let idx = Self::ALL.iter().position(|&r| r == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    pub fn prev(self) -> Option<Runlevel> {
        let idx = Self::ALL.iter().position(|&r| r == self)?;
        idx.checked_sub(1).map(|i| Self::ALL[i])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    BringUp,
    TearDown,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RunlevelProperty: u16 {
        const REQUEST    = 0b0000_0000_0001;
        const RESPONSE   = 0b0000_0000_0010;
        const RELEASE    = 0b0000_0000_0100;
        const ASYNC      = 0b0000_0000_1000;
        const BARRIER    = 0b0000_0001_0000;
        const BRING_UP   = 0b0000_0010_0000;
        const TEAR_DOWN  = 0b0000_0100_0000;
        const PD_MASTER  = 0b0000_1000_0000;
        const NODE_MASTER = 0b0001_0000_0000;
        const BLESSED    = 0b0010_0000_0000;
        const FROM_MSG   = 0b0100_0000_0000;
    }
}

/// A single `switchRunlevel(pd, level, phase, properties)` call.
#[derive(Debug, Clone, Copy)]
pub struct RunlevelSwitch {
    pub level: Runlevel,
    pub phase: u32,
    pub direction: Direction,
    pub properties: RunlevelProperty,
}

/// Declares which `(level, direction)` pairs a factory or heuristic
/// tolerates a switch during, independent of ongoing work. Most of this
/// crate's heuristics only need to refuse switches outside `ComputeOk`
/// bring-up, since that's the only level at which `get_work`/`notify` are
/// ever called.
pub trait RunlevelAware {
    /// Whether this component accepts a switch to `switch.level` in
    /// `switch.direction` right now.
    fn accepts(&self, switch: &RunlevelSwitch) -> bool {
        matches!(
            (switch.level, switch.direction),
            (Runlevel::ComputeOk, Direction::BringUp) | (Runlevel::ComputeOk, Direction::TearDown)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_progress_in_declared_order() {
        assert_eq!(Runlevel::ConfigParse.next(), Some(Runlevel::NetworkOk));
        assert_eq!(Runlevel::UserOk.next(), None);
        assert_eq!(Runlevel::UserOk.prev(), Some(Runlevel::ComputeOk));
    }

    #[test]
    fn property_bitfield_combines() {
        let props = RunlevelProperty::REQUEST | RunlevelProperty::BRING_UP | RunlevelProperty::PD_MASTER;
        assert!(props.contains(RunlevelProperty::BRING_UP));
        assert!(!props.contains(RunlevelProperty::TEAR_DOWN));
    }
}
