//! Message transport abstraction.
//!
//! The scheduler core does not own the message transport (section 1's
//! non-goals name it as a collaborator), but `transact` and `analyze` need
//! *something* to move bytes between policy domains, and the CE heuristic's
//! failure semantics are defined in terms of what the transport reports back
//! (`location-dead`). This module defines the narrow trait the core depends
//! on and one in-memory implementation used by tests, per the Design Notes'
//! instruction that "multi-PD tests must run each PD's scheduler on its own
//! thread group and exchange messages through a mock transport."

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{SchedulerError, SchedulerResult};
use crate::message::PolicyMessage;

/// Identifies a policy domain (PD) in the running topology.
///
/// `0` is not reserved; any `u32` is a valid location as long as it has been
/// registered with the transport in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location(pub u32);

impl Location {
    /// Sentinel used by code paths that haven't resolved a destination yet.
    pub const UNKNOWN: Location = Location(u32::MAX);
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PD{}", self.0)
    }
}

/// Delivery outcome a transport can report for a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was handed off; the destination may still process it.
    Delivered,
    /// The destination could not be reached right now but may come back.
    Transient,
    /// The destination is permanently gone (`location-dead`).
    Dead,
}

/// The narrow send/receive contract the scheduler core depends on.
///
/// Implementations are free to be synchronous-in-disguise (as
/// [`InMemoryTransport`] is) or backed by a real network stack; the core
/// never inspects the implementation, only [`SendOutcome`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send a policy message to `dest`, returning once the transport has an
    /// opinion about deliverability.
    async fn send(&self, dest: Location, message: PolicyMessage) -> SchedulerResult<()>;

    /// Mark a location as unreachable for the remainder of the run. Used by
    /// tests to exercise the CE heuristic's dead-neighbour demotion without
    /// a real failure.
    fn mark_dead(&self, location: Location);
}

/// An in-process transport connecting a fixed set of locations via
/// `tokio::mpsc` channels. Each [`InMemoryTransport`] handle is one PD's view
/// of the network; `send` looks up the peer's queue and pushes onto it,
/// `recv` drains this PD's own queue.
pub struct InMemoryTransport {
    here: Location,
    peers: Arc<Mutex<HashMap<Location, mpsc::UnboundedSender<PolicyMessage>>>>,
    dead: Arc<Mutex<std::collections::HashSet<Location>>>,
    inbox: Mutex<mpsc::UnboundedReceiver<PolicyMessage>>,
}

impl InMemoryTransport {
    /// Build a fully-connected mesh of `count` in-memory transports, one per
    /// location `0..count`.
    pub fn mesh(count: u32) -> Vec<InMemoryTransport> {
        let peers: Arc<Mutex<HashMap<Location, mpsc::UnboundedSender<PolicyMessage>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let dead = Arc::new(Mutex::new(std::collections::HashSet::new()));

        let mut transports = Vec::with_capacity(count as usize);
        for i in 0..count {
            let (tx, rx) = mpsc::unbounded_channel();
            let here = Location(i);
            peers.lock().insert(here, tx);
            transports.push(InMemoryTransport {
                here,
                peers: peers.clone(),
                dead: dead.clone(),
                inbox: Mutex::new(rx),
            });
        }

        transports
    }

    /// This transport's own location.
    pub fn location(&self) -> Location {
        self.here
    }

    /// Drain and return the next message addressed to this location, if any
    /// is queued. Non-blocking: used by test harnesses driving each PD's
    /// event loop manually.
    pub fn try_recv(&self) -> Option<PolicyMessage> {
        self.inbox.lock().try_recv().ok()
    }

    /// Await the next message addressed to this location.
    pub async fn recv(&self) -> Option<PolicyMessage> {
        self.inbox.lock().recv().await
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, dest: Location, message: PolicyMessage) -> SchedulerResult<()> {
        if self.dead.lock().contains(&dest) {
            return Err(SchedulerError::PermanentSendFailure { location: dest });
        }

        let sender = {
            let peers = self.peers.lock();
            peers.get(&dest).cloned()
        };

        match sender {
            Some(sender) => sender
                .send(message)
                .map_err(|_| SchedulerError::PermanentSendFailure { location: dest }),
            None => Err(SchedulerError::BadLocation(dest)),
        }
    }

    fn mark_dead(&self, location: Location) {
        self.dead.lock().insert(location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PolicyMessage;

    #[tokio::test]
    async fn mesh_delivers_between_peers() {
        let mut mesh = InMemoryTransport::mesh(2);
        let pd1 = mesh.pop().unwrap();
        let pd0 = mesh.pop().unwrap();

        pd0.send(pd1.location(), PolicyMessage::noop(pd0.location(), pd1.location()))
            .await
            .unwrap();

        let msg = pd1.recv().await.unwrap();
        assert_eq!(msg.source, pd0.location());
    }

    #[tokio::test]
    async fn dead_peer_is_reported_permanent() {
        let mesh = InMemoryTransport::mesh(2);
        let pd0 = &mesh[0];
        let pd1_loc = mesh[1].location();

        pd0.mark_dead(pd1_loc);
        let result = pd0
            .send(pd1_loc, PolicyMessage::noop(pd0.location(), pd1_loc))
            .await;

        assert!(matches!(
            result,
            Err(SchedulerError::PermanentSendFailure { location }) if location == pd1_loc
        ));
    }
}
