//! The client registry: the table of live sessions.

use std::collections::HashMap;

use rand::Rng;
use voxelcast_protocol::{PlayerState, ServerEvent, SessionId};

use crate::{RegistryError, Session, SessionSender};

/// Tracks every connected session, keyed by session id.
///
/// The registry is pure bookkeeping: it stores sessions, hands out ids,
/// and delivers single-recipient events. Fan-out and departure
/// announcements live in [`crate::BroadcastRouter`], which drives the
/// registry mutably.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session and returns its id.
    ///
    /// With `requested: None` a fresh random id is generated; ids are
    /// 32 lowercase hex characters (128 bits), so collisions are not a
    /// practical concern, but generation still retries on one.
    ///
    /// # Errors
    /// [`RegistryError::DuplicateId`] when `requested` names an id that
    /// is already registered.
    pub fn add_session(
        &mut self,
        outbound: SessionSender,
        requested: Option<SessionId>,
    ) -> Result<SessionId, RegistryError> {
        let id = match requested {
            Some(id) => {
                if self.sessions.contains_key(&id) {
                    return Err(RegistryError::DuplicateId(id));
                }
                id
            }
            None => loop {
                let id = generate_id();
                if !self.sessions.contains_key(&id) {
                    break id;
                }
            },
        };

        self.sessions.insert(id.clone(), Session::new(id.clone(), outbound));
        tracing::info!(%id, sessions = self.sessions.len(), "session registered");
        Ok(id)
    }

    /// Removes a session if present. Idempotent: removing an id that is
    /// not registered is a no-op and returns `false`.
    pub fn remove_session(&mut self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            tracing::info!(%id, sessions = self.sessions.len(), "session removed");
        }
        removed
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Queues an event for a single session.
    ///
    /// # Errors
    /// - [`RegistryError::NotFound`] — no such session
    /// - [`RegistryError::ChannelClosed`] — the session's writer is gone;
    ///   the caller should remove the session
    pub fn send_to(
        &self,
        id: &SessionId,
        event: ServerEvent,
    ) -> Result<(), RegistryError> {
        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        if session.send(event) {
            Ok(())
        } else {
            Err(RegistryError::ChannelClosed(id.clone()))
        }
    }

    /// Applies a mutation to a session's player state. Returns `false`
    /// when the session is not registered.
    pub fn update_player(
        &mut self,
        id: &SessionId,
        apply: impl FnOnce(&mut PlayerState),
    ) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                apply(session.player_mut());
                true
            }
            None => false,
        }
    }

    /// Last committed player state for one session.
    pub fn player(&self, id: &SessionId) -> Option<PlayerState> {
        self.sessions.get(id).map(|s| *s.player())
    }

    /// Snapshot of every session's player state, for the periodic
    /// update broadcast.
    pub fn snapshot(&self) -> HashMap<SessionId, PlayerState> {
        self.sessions
            .iter()
            .map(|(id, s)| (id.clone(), *s.player()))
            .collect()
    }

    /// Iterates over live sessions. Order is unspecified.
    pub(crate) fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex session id (128 bits of entropy).
fn generate_id() -> SessionId {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    SessionId::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use voxelcast_protocol::Vec3;

    fn sender() -> SessionSender {
        let (tx, rx) = mpsc::unbounded_channel();
        // Keep the receiver alive for the duration of the test.
        std::mem::forget(rx);
        tx
    }

    #[test]
    fn test_add_session_generates_32_hex_char_id() {
        let mut reg = ClientRegistry::new();
        let id = reg.add_session(sender(), None).unwrap();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(reg.contains(&id));
    }

    #[test]
    fn test_add_session_generated_ids_are_unique() {
        let mut reg = ClientRegistry::new();
        let a = reg.add_session(sender(), None).unwrap();
        let b = reg.add_session(sender(), None).unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_add_session_honors_requested_id() {
        let mut reg = ClientRegistry::new();
        let id = reg
            .add_session(sender(), Some(SessionId::new("observer")))
            .unwrap();
        assert_eq!(id, SessionId::new("observer"));
    }

    #[test]
    fn test_add_session_rejects_duplicate_requested_id() {
        let mut reg = ClientRegistry::new();
        reg.add_session(sender(), Some(SessionId::new("dup"))).unwrap();

        let result = reg.add_session(sender(), Some(SessionId::new("dup")));
        assert!(
            matches!(result, Err(RegistryError::DuplicateId(id)) if id.as_str() == "dup")
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_remove_session_is_idempotent() {
        let mut reg = ClientRegistry::new();
        let id = reg.add_session(sender(), None).unwrap();

        assert!(reg.remove_session(&id));
        assert!(!reg.remove_session(&id), "second removal is a no-op");
        assert!(reg.is_empty());
    }

    #[test]
    fn test_send_to_unknown_session_is_not_found() {
        let reg = ClientRegistry::new();
        let result = reg.send_to(
            &SessionId::new("ghost"),
            ServerEvent::Chat { text: "x".into() },
        );
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_send_to_closed_channel_reports_channel_closed() {
        let mut reg = ClientRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = reg.add_session(tx, None).unwrap();
        drop(rx);

        let result = reg.send_to(&id, ServerEvent::Chat { text: "x".into() });
        assert!(matches!(result, Err(RegistryError::ChannelClosed(_))));
        // send_to never mutates; removal is the caller's decision.
        assert!(reg.contains(&id));
    }

    #[test]
    fn test_update_player_commits_state() {
        let mut reg = ClientRegistry::new();
        let id = reg.add_session(sender(), None).unwrap();

        let updated = reg.update_player(&id, |p| {
            p.position = Vec3::new(1.0, 2.0, 3.0);
        });
        assert!(updated);
        assert_eq!(reg.player(&id).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_update_player_unknown_session_returns_false() {
        let mut reg = ClientRegistry::new();
        assert!(!reg.update_player(&SessionId::new("ghost"), |p| {
            p.position = Vec3::new(9.0, 9.0, 9.0);
        }));
    }

    #[test]
    fn test_snapshot_covers_every_session() {
        let mut reg = ClientRegistry::new();
        let a = reg.add_session(sender(), None).unwrap();
        let b = reg.add_session(sender(), None).unwrap();
        reg.update_player(&a, |p| p.position = Vec3::new(1.0, 0.0, 0.0));

        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[&a].position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(snap[&b].position, Vec3::ZERO);
    }
}
