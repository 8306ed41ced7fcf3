//! End-to-end scenarios exercising the scheduling core across its public
//! surface rather than one module at a time.

use edt_scheduler::container::PdSpace;
use edt_scheduler::db::{DbEffect, DbSpace, DbSpaceState};
use edt_scheduler::edt::Edt;
use edt_scheduler::guid::Guid;
use edt_scheduler::heuristics::ce::Ce;
use edt_scheduler::heuristics::hc::Hc;
use edt_scheduler::heuristics::st::St;
use edt_scheduler::heuristics::static_heuristic::StaticHeuristic;
use edt_scheduler::hint::{Disperse, EdtProperty};
use edt_scheduler::message::{MessageKind, PolicyMessage, SchedulerObjectPayload};
use edt_scheduler::transport::{InMemoryTransport, Location, Transport};

fn loc(n: u32) -> Location {
    Location(n)
}

/// Scenario 1: two-PD ping. PD0's scheduler places an EDT, marshals it onto
/// the wire, ships it across a real (in-memory) transport to the chosen
/// peer, and the peer reconstructs and runs it.
#[tokio::test]
async fn two_pd_ping_places_and_transacts_edt() {
    let mesh = InMemoryTransport::mesh(2);
    let pd0 = &mesh[0];
    let pd1 = &mesh[1];

    let scheduler = St::new(loc(0), loc(0), 1, 1);

    // PD0 creates DB D locally; since it's created on the scheduler node
    // itself, no analyze(create) needs to cross the wire.
    let create_effects = scheduler.db_create(Guid(1), 64, Some(0xdb), 1);
    assert!(create_effects.is_empty(), "scheduler-local create needs no analyze(create)");

    // Placement: D is the EDT's only dep, already at (here, 1).
    let (placement, _effects) = scheduler.place_edt(&[(Guid(1), 64)]).unwrap();
    assert_eq!(placement, (loc(0), 1));

    // The EDT is transacted to PD1 for this round trip.
    let destination = pd1.location();
    let mut edt = Edt::new(Guid(2), Guid(200), 0, 1);
    edt.deps[0].db = Some(Guid(1));
    let marshalled = edt_scheduler::marshal::marshal_edt(&edt).unwrap();
    assert!(!marshalled.is_empty());

    pd0.send(
        destination,
        PolicyMessage::new(
            pd0.location(),
            destination,
            true,
            1,
            MessageKind::SchedTransact(SchedulerObjectPayload::Edt(edt.clone())),
        ),
    )
    .await
    .unwrap();

    let received = pd1.recv().await.unwrap();
    let restored = match received.kind {
        MessageKind::SchedTransact(SchedulerObjectPayload::Edt(e)) => e,
        other => panic!("expected SchedTransact(Edt), got {other:?}"),
    };
    assert_eq!(restored.guid, Guid(2));

    // PD1 acquires D (already present locally in this scenario) and the
    // EDT becomes runnable once its dep is marked acquired.
    let mut arrived = restored;
    arrived.deps[0].ptr = Some(0xdb);
    arrived.recompute_state();
    assert!(arrived.is_runnable());
}

/// Scenario 2: work-stealing LIFO/FIFO, driven through the `hc` heuristic
/// rather than the bare container.
#[test]
fn work_stealing_returns_lifo_to_owner_fifo_to_thief() {
    let hc = Hc::new(2, loc(0));
    hc.push_ready(0, None, Guid(1)); // A
    hc.push_ready(0, None, Guid(2)); // B
    hc.push_ready(0, None, Guid(3)); // C

    assert_eq!(hc.get_work(0).unwrap(), Some(Guid(3)), "owner pops LIFO: C");
    assert_eq!(hc.get_work(1).unwrap(), Some(Guid(1)), "thief steals FIFO: A");
    assert_eq!(hc.get_work(0).unwrap(), Some(Guid(2)), "owner pops remaining: B");
}

/// Scenario 3: disperse hint round-robin across four workers.
#[test]
fn disperse_hint_distributes_one_edt_per_worker() {
    let statik = StaticHeuristic::new(4, vec![], false, loc(0));
    let pd = PdSpace::new(4, false);

    let mut edts: Vec<Edt> = (0..4)
        .map(|i| {
            let mut e = Edt::new(Guid(i + 1), Guid(100), 0, 0);
            e.hint.set_disperse(Disperse::Any);
            e
        })
        .collect();

    for edt in &mut edts {
        statik.place_edt_create(edt);
        let worker = edt.hint.get_u64(EdtProperty::Space).unwrap();
        pd.push_ready(worker as usize, edt.guid).unwrap();
    }

    let mut seen = Vec::new();
    for w in 0..4 {
        seen.push(pd.wst().worker(w).unwrap().pop().unwrap());
    }
    seen.sort();
    assert_eq!(seen, vec![Guid(1), Guid(2), Guid(3), Guid(4)]);
}

/// Scenario 4: CE parent fallback — eight XEs all request work from an
/// empty block-0 CE, which must escalate exactly once to its parent and
/// then service the first pending XE once work arrives.
#[test]
fn ce_escalates_once_to_parent_then_services_first_pending_xe() {
    let xes: Vec<Location> = (0..8).map(loc).collect();
    let ce = Ce::new(loc(100), xes, vec![], Some(loc(200)));

    for xe in 0..8 {
        assert_eq!(ce.request_work(xe).unwrap(), None);
        assert!(ce.context(xe).unwrap().is_pending());
    }

    let escalations = ce.update_idle();
    assert_eq!(escalations.len(), 1, "exactly one forced request to the parent");
    assert_eq!(escalations[0].dest, loc(200));

    // The parent's reply lands directly on XE0's own deque via the
    // `slot-max-access` hint.
    let reply = Guid(999);
    let mut placeholder = Edt::new(reply, Guid(1), 0, 0);
    placeholder.hint.set_u64(EdtProperty::SlotMaxAccess, 0).unwrap();
    ce.push_ready(&placeholder);

    assert_eq!(ce.request_work(0).unwrap(), Some(reply));
}

/// Scenario 5: ST time-shift. A DB's first time slot serves two EDTs; once
/// both are done the scheduler time-shifts it to a later slot on a
/// different PD, and the third EDT runs there once the payload arrives.
#[test]
fn st_time_shift_moves_db_after_first_slot_drains() {
    let mut db = DbSpace::at_scheduler(None, Guid(2), 64, loc(0), 1).unwrap();
    db.timeline.front_mut().unwrap().scheduler_count = Some(2);
    db.ensure_time_slot(loc(1), 2);

    db.done_at_scheduler(1).unwrap();
    assert!(!db.timeline.front().unwrap().scheduler_done, "only one of two EDTs done");

    db.done_at_scheduler(1).unwrap();
    assert!(db.timeline.front().unwrap().scheduler_done, "both EDTs done, later slot exists");

    let effects = db.time_shift_at_scheduler().unwrap();
    assert_eq!(effects, vec![DbEffect::AnalyzeUpdate { to: loc(1), db: Guid(2), time: 2 }]);
    assert_eq!(db.timeline.len(), 1);
    assert_eq!(db.timeline.front().unwrap().space, loc(1));

    // Source PD ships the DB once it has gone locally inactive.
    let (mut src, _) = DbSpace::create(Guid(2), 64, Some(0xaaa), loc(0), 1, loc(0), loc(0));
    src.state = DbSpaceState::LocalInactive;
    let move_effects = src.move_src(loc(1)).unwrap();
    assert_eq!(move_effects, vec![DbEffect::Transact { to: loc(1), db: Guid(2) }]);
    assert!(src.ptr.is_none());

    // Destination PD acknowledges arrival, then the payload lands.
    let mut dst = DbSpace::move_dst(None, Guid(2), 0, loc(1), 2).unwrap();
    assert_eq!(dst.state, DbSpaceState::RemoteInactive);
    let wake = dst.at_space(0xbbb, 64);
    assert!(wake.is_empty(), "no EDT was parked on this slot's wait list");
    assert_eq!(dst.state, DbSpaceState::LocalInactive);
    assert_eq!(dst.ptr, Some(0xbbb));

    // The third EDT now finds D present locally.
    let present = dst.edt_at_space(2, Guid(3)).unwrap();
    assert!(present);
}

/// Scenario 6: trylock livelock avoidance. Two EDTs each depending on DBs
/// {X, Y} are placed concurrently; both must complete with a valid
/// `(space, time)` placement rather than deadlocking against each other.
#[test]
fn concurrent_multi_dep_placement_avoids_livelock() {
    use std::sync::Arc;
    use std::thread;

    let scheduler = Arc::new(St::new(loc(0), loc(0), 1, 1));
    scheduler.db_at_scheduler(Guid(10), 64, loc(0), 1);
    scheduler.db_at_scheduler(Guid(11), 32, loc(0), 1);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let scheduler = scheduler.clone();
            thread::spawn(move || scheduler.place_edt(&[(Guid(10), 64), (Guid(11), 32)]).unwrap())
        })
        .collect();

    for h in handles {
        let (placement, _effects) = h.join().unwrap();
        assert_eq!(placement, (loc(0), 1));
    }
}
