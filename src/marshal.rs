//! Scheduler-object marshalling (section 6).
//!
//! The wire format isn't a literal byte-for-byte port of the pointer-fixup
//! scheme the original uses (`(offset<<1)|isAddl` relative offsets only
//! make sense against a C struct laid out in one buffer) — `bincode` gives
//! the same "one flat buffer, no allocator needed to reconstruct" property
//! over a `serde`-derived shape, which is the actual contract downstream
//! code depends on. What does carry over exactly: local pointers
//! (`DepSlot::ptr`) are nulled before marshalling and are always `None`
//! after unmarshalling, to be rebuilt by the receiver's own acquire path,
//! matching the round-trip law in section 8.

use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::edt::Edt;
use crate::error::{SchedulerError, SchedulerResult};

/// Wire shape for an EDT transact. Mirrors [`Edt`] but storage-only: no
/// local pointer travels, since it's meaningless off the sending PD.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireEdt {
    guid: crate::guid::Guid,
    template_guid: crate::guid::Guid,
    param_count: u32,
    params: Vec<u64>,
    deps: Vec<WireDepSlot>,
    state: WireEdtState,
    flags: u8,
    location: crate::transport::Location,
    scheduled: Option<(crate::transport::Location, u64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireDepSlot {
    db: Option<crate::guid::Guid>,
    mode: WireAccessMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum WireAccessMode {
    Ro,
    Rw,
    Wo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum WireEdtState {
    Created,
    AllDepsAdded,
    Partial,
    AllSatisfied,
    AllAcquired,
    Running,
    Reaping,
    Rescheduled,
}

fn mode_to_wire(m: crate::edt::AccessMode) -> WireAccessMode {
    match m {
        crate::edt::AccessMode::Ro => WireAccessMode::Ro,
        crate::edt::AccessMode::Rw => WireAccessMode::Rw,
        crate::edt::AccessMode::Wo => WireAccessMode::Wo,
    }
}

fn mode_from_wire(m: WireAccessMode) -> crate::edt::AccessMode {
    match m {
        WireAccessMode::Ro => crate::edt::AccessMode::Ro,
        WireAccessMode::Rw => crate::edt::AccessMode::Rw,
        WireAccessMode::Wo => crate::edt::AccessMode::Wo,
    }
}

fn state_to_wire(s: crate::edt::EdtState) -> WireEdtState {
    use crate::edt::EdtState::*;
    match s {
        Created => WireEdtState::Created,
        AllDepsAdded => WireEdtState::AllDepsAdded,
        Partial => WireEdtState::Partial,
        AllSatisfied => WireEdtState::AllSatisfied,
        AllAcquired => WireEdtState::AllAcquired,
        Running => WireEdtState::Running,
        Reaping => WireEdtState::Reaping,
        Rescheduled => WireEdtState::Rescheduled,
    }
}

fn state_from_wire(s: WireEdtState) -> crate::edt::EdtState {
    use crate::edt::EdtState::*;
    match s {
        WireEdtState::Created => Created,
        WireEdtState::AllDepsAdded => AllDepsAdded,
        WireEdtState::Partial => Partial,
        WireEdtState::AllSatisfied => AllSatisfied,
        WireEdtState::AllAcquired => AllAcquired,
        WireEdtState::Running => Running,
        WireEdtState::Reaping => Reaping,
        WireEdtState::Rescheduled => Rescheduled,
    }
}

/// Serialise an EDT for `SCHED_TRANSACT`, nulling local pointers.
pub fn marshal_edt(edt: &Edt) -> SchedulerResult<Vec<u8>> {
    let wire = WireEdt {
        guid: edt.guid,
        template_guid: edt.template_guid,
        param_count: edt.param_count,
        params: edt.params.clone(),
        deps: edt
            .deps
            .iter()
            .map(|d| WireDepSlot {
                db: d.db,
                mode: mode_to_wire(d.mode),
            })
            .collect(),
        state: state_to_wire(edt.state),
        flags: edt.flags.bits(),
        location: edt.location,
        scheduled: edt.scheduled,
    };
    bincode::serialize(&wire).map_err(|e| SchedulerError::Internal(format!("marshal edt: {e}")))
}

/// Reconstructs an EDT from a marshalled buffer; every `DepSlot::ptr` comes
/// back `None`, rebuilt by the receiver's acquire path rather than carried
/// on the wire.
pub fn unmarshal_edt(bytes: &[u8]) -> SchedulerResult<Edt> {
    let wire: WireEdt = bincode::deserialize(bytes).map_err(|e| SchedulerError::Internal(format!("unmarshal edt: {e}")))?;
    Ok(Edt {
        guid: wire.guid,
        template_guid: wire.template_guid,
        param_count: wire.param_count,
        params: wire.params,
        deps: wire
            .deps
            .into_iter()
            .map(|d| crate::edt::DepSlot {
                db: d.db,
                mode: mode_from_wire(d.mode),
                ptr: None,
            })
            .collect(),
        state: state_from_wire(wire.state),
        flags: crate::edt::EdtFlags::from_bits_truncate(wire.flags),
        hint: crate::hint::EdtHint::new(),
        location: wire.location,
        scheduled: wire.scheduled,
    })
}

/// Serialise a DB record; when `mapping != released` the caller appends
/// `size` raw bytes after this header itself (section 6, "DB transport") —
/// this function only marshals the metadata.
pub fn marshal_db(db: &Db) -> SchedulerResult<Vec<u8>> {
    bincode::serialize(&(db.guid, db.size, db.home, mode_to_wire(db.mode)))
        .map_err(|e| SchedulerError::Internal(format!("marshal db: {e}")))
}

pub fn unmarshal_db(bytes: &[u8]) -> SchedulerResult<Db> {
    let (guid, size, home, mode): (crate::guid::Guid, u64, crate::transport::Location, WireAccessMode) =
        bincode::deserialize(bytes).map_err(|e| SchedulerError::Internal(format!("unmarshal db: {e}")))?;
    Ok(Db::new(guid, size, home, mode_from_wire(mode)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::Guid;
    use crate::transport::Location;

    #[test]
    fn edt_round_trips_modulo_local_pointer() {
        let mut edt = Edt::new(Guid(1), Guid(100), 2, 1);
        edt.params[0] = 7;
        edt.deps[0].db = Some(Guid(50));
        edt.deps[0].ptr = Some(0xdead_beef);
        edt.recompute_state();

        let bytes = marshal_edt(&edt).unwrap();
        let back = unmarshal_edt(&bytes).unwrap();

        assert_eq!(back.guid, edt.guid);
        assert_eq!(back.deps.len(), edt.deps.len());
        assert_eq!(back.deps[0].db, edt.deps[0].db);
        assert_eq!(back.deps[0].ptr, None, "local pointer must not survive the wire");
    }

    #[test]
    fn db_round_trips() {
        let db = Db::new(Guid(1), 4096, Location(2), crate::edt::AccessMode::Ro);
        let bytes = marshal_db(&db).unwrap();
        let back = unmarshal_db(&bytes).unwrap();
        assert_eq!(back.guid, db.guid);
        assert_eq!(back.size, db.size);
        assert_eq!(back.home, db.home);
    }
}
