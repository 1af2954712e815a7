//! Broadcast fan-out with failure isolation.

use tracing::warn;
use voxelcast_protocol::{ServerEvent, SessionId};

use crate::{ClientRegistry, LocalEvent, LocalEvents};

/// Who a broadcast reaches, and whether local observers see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastScope<'a> {
    /// Every session, and the event is surfaced to local observers.
    All,
    /// Every session except the originator. Observers still see it.
    Except(&'a SessionId),
    /// Every session, but local observers are not notified. Used for
    /// server-originated traffic observers have no interest in echoing.
    AllQuiet,
}

/// Fans [`ServerEvent`]s out to registered sessions.
///
/// Delivery to one recipient never affects the others: a session whose
/// outbound queue is closed is skipped, and after the pass it is removed
/// from the registry exactly once and its departure announced to the
/// survivors. A departure announcement can itself discover further dead
/// sessions, so removal cascades until the registry is quiescent.
#[derive(Debug, Clone, Default)]
pub struct BroadcastRouter {
    observers: LocalEvents,
}

impl BroadcastRouter {
    pub fn new(observers: LocalEvents) -> Self {
        Self { observers }
    }

    /// The observer channel this router publishes into.
    pub fn observers(&self) -> &LocalEvents {
        &self.observers
    }

    /// Fans `event` out per `scope`. Returns the ids of sessions that
    /// were found dead and removed during the pass.
    pub fn broadcast(
        &self,
        registry: &mut ClientRegistry,
        scope: BroadcastScope<'_>,
        event: ServerEvent,
    ) -> Vec<SessionId> {
        let mut all_removed = Vec::new();
        let mut dead = self.deliver(registry, scope, event);

        while !dead.is_empty() {
            let mut next = Vec::new();
            for id in dead {
                if registry.remove_session(&id) {
                    warn!(%id, "outbound channel closed, dropping session");
                    next.extend(self.deliver(
                        registry,
                        BroadcastScope::All,
                        ServerEvent::Leave { id: id.clone() },
                    ));
                    all_removed.push(id);
                }
            }
            dead = next;
        }

        all_removed
    }

    /// Removes a session and announces its departure to the survivors.
    /// Safe to call for ids that are already gone.
    pub fn drop_session(&self, registry: &mut ClientRegistry, id: &SessionId) {
        if registry.remove_session(id) {
            self.broadcast(
                registry,
                BroadcastScope::All,
                ServerEvent::Leave { id: id.clone() },
            );
        }
    }

    /// One delivery pass: queue the event for every in-scope session,
    /// surface it to observers unless the scope is quiet, and report the
    /// sessions whose queues turned out to be closed.
    fn deliver(
        &self,
        registry: &ClientRegistry,
        scope: BroadcastScope<'_>,
        event: ServerEvent,
    ) -> Vec<SessionId> {
        if !matches!(scope, BroadcastScope::AllQuiet) {
            self.observers.emit(LocalEvent::Broadcast(event.clone()));
        }

        let mut dead = Vec::new();
        for session in registry.sessions() {
            if let BroadcastScope::Except(excluded) = scope {
                if session.id() == excluded {
                    continue;
                }
            }
            if !session.send(event.clone()) {
                dead.push(session.id().clone());
            }
        }
        dead
    }
}

// =========================================================================
// Tests
// =========================================================================
