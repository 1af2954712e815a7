//! A single registered client session.

use tokio::sync::mpsc;
use voxelcast_protocol::{PlayerState, ServerEvent, SessionId};

/// Outbound event queue for one session.
///
/// Unbounded so fan-out never blocks on a slow client; the connection's
/// handler task drains the queue onto the socket. When that task is gone
/// the channel is closed and the session is considered dead.
pub type SessionSender = mpsc::UnboundedSender<ServerEvent>;

/// One connected client as the registry sees it.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    outbound: SessionSender,
    player: PlayerState,
}

impl Session {
    /// New session with a zeroed player state. Position stays zeroed
    /// until the first state report commits.
    pub fn new(id: SessionId, outbound: SessionSender) -> Self {
        Self {
            id,
            outbound,
            player: PlayerState::default(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Last committed player state.
    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    /// Queues an event for this session. Returns `false` when the
    /// outbound channel is closed — the caller should remove the session.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.outbound.send(event).is_ok()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_zeroed_player_state() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(SessionId::new("s1"), tx);
        assert_eq!(session.player().position, voxelcast_protocol::Vec3::ZERO);
        assert_eq!(session.player().rotation, voxelcast_protocol::Vec3::ZERO);
    }

    #[test]
    fn test_send_delivers_while_receiver_alive() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new(SessionId::new("s1"), tx);

        assert!(session.send(ServerEvent::Chat {
            text: "hello".into()
        }));
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerEvent::Chat { text }) if text == "hello"
        ));
    }

    #[test]
    fn test_send_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(SessionId::new("s1"), tx);
        drop(rx);

        assert!(!session.send(ServerEvent::Chat { text: "x".into() }));
    }
}
