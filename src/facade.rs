//! Scheduler facade (section 4.1).
//!
//! The single entry point a PD's workers and message-handling code call
//! through: `get_work`, `notify`, `transact`, `analyze`, each dispatched to
//! one of the configured heuristic instances by id. `master_heuristic_id`
//! is the default `get_work` uses when no specific heuristic is named.

use crate::error::{SchedulerError, SchedulerResult};
use crate::guid::Guid;
use crate::heuristics::Heuristic;
use crate::message::{AnalyzeKind, AnalyzeProperty, MessageKind, NotifyKind, PolicyMessage, SchedulerObjectPayload};
use crate::transport::Location;

pub struct SchedulerFacade {
    heuristics: Vec<Box<dyn Heuristic>>,
    master_heuristic_id: usize,
    here: Location,
}

impl SchedulerFacade {
    pub fn new(heuristics: Vec<Box<dyn Heuristic>>, master_heuristic_id: usize, here: Location) -> SchedulerResult<Self> {
        if master_heuristic_id >= heuristics.len() {
            return Err(SchedulerError::InvalidArgument(format!(
                "master_heuristic_id {master_heuristic_id} out of range ({} heuristics configured)",
                heuristics.len()
            )));
        }
        Ok(Self {
            heuristics,
            master_heuristic_id,
            here,
        })
    }

    fn heuristic(&self, id: usize) -> SchedulerResult<&dyn Heuristic> {
        self.heuristics
            .get(id)
            .map(|h| h.as_ref())
            .ok_or_else(|| SchedulerError::InvalidArgument(format!("no heuristic {id}")))
    }

    /// `get_work(worker)` against the master heuristic.
    pub fn get_work(&self, worker: usize) -> SchedulerResult<Option<Guid>> {
        self.get_work_via(self.master_heuristic_id, worker)
    }

    pub fn get_work_via(&self, heuristic_id: usize, worker: usize) -> SchedulerResult<Option<Guid>> {
        self.heuristic(heuristic_id)?.get_work(worker)
    }

    pub fn notify(
        &self,
        heuristic_id: usize,
        kind: NotifyKind,
        edt: Option<Guid>,
        db: Option<Guid>,
    ) -> SchedulerResult<Vec<PolicyMessage>> {
        self.heuristic(heuristic_id)?.notify(kind, edt, db)
    }

    pub fn notify_master(&self, kind: NotifyKind, edt: Option<Guid>, db: Option<Guid>) -> SchedulerResult<Vec<PolicyMessage>> {
        self.notify(self.master_heuristic_id, kind, edt, db)
    }

    pub fn analyze(
        &self,
        heuristic_id: usize,
        kind: AnalyzeKind,
        property: AnalyzeProperty,
        edt: Option<Guid>,
        db: Option<Guid>,
    ) -> SchedulerResult<Vec<PolicyMessage>> {
        self.heuristic(heuristic_id)?.analyze(kind, property, edt, db)
    }

    /// `transact(schedulerObject)`: wraps a payload for transport. Actual
    /// marshalling into wire bytes is [`crate::marshal`]'s job; this just
    /// frames the outgoing message (section 4.1, section 6).
    pub fn transact(&self, to: Location, payload: SchedulerObjectPayload, msg_id: u64) -> PolicyMessage {
        PolicyMessage::new(self.here, to, true, msg_id, MessageKind::SchedTransact(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::hc::Hc;

    #[test]
    fn rejects_out_of_range_master_id() {
        let heuristics: Vec<Box<dyn Heuristic>> = vec![Box::new(Hc::new(1, Location(0)))];
        assert!(SchedulerFacade::new(heuristics, 5, Location(0)).is_err());
    }

    #[test]
    fn get_work_dispatches_to_master_heuristic() {
        let hc = Hc::new(1, Location(0));
        hc.push_ready(0, None, Guid(42));
        let heuristics: Vec<Box<dyn Heuristic>> = vec![Box::new(hc)];
        let facade = SchedulerFacade::new(heuristics, 0, Location(0)).unwrap();
        assert_eq!(facade.get_work(0).unwrap(), Some(Guid(42)));
    }
}
