//! In-process notifications for embedders.
//!
//! A game embedding the sync server usually wants to observe what the
//! server is doing — spawn an avatar when a session finishes its handshake,
//! generate a chunk when an edit lands outside the world — without parsing
//! wire traffic. [`LocalEvents`] is that tap: a `tokio::sync::broadcast`
//! channel the server publishes into and any number of observers subscribe
//! to. Publishing never blocks and never fails; observers that fall behind
//! lose the oldest events (`RecvError::Lagged`), which is the right trade
//! for a notification stream.

use tokio::sync::broadcast;
use voxelcast_protocol::{BlockPos, ServerEvent, SessionId};

/// Default buffer depth for the observer channel.
const DEFAULT_CAPACITY: usize = 64;

/// A server-side notification, visible only to in-process observers.
#[derive(Debug, Clone)]
pub enum LocalEvent {
    /// A session completed its handshake and received the full world.
    ClientCreated(SessionId),

    /// A session's player state changed (position/rotation committed).
    ClientState(SessionId),

    /// A client event failed while being handled. The session stays
    /// connected; the error is for diagnostics.
    HandlerError { id: SessionId, message: String },

    /// A block edit landed outside every chunk. The embedder may react
    /// by generating the missing chunk.
    MissingChunk(BlockPos),

    /// Pass-through of an event broadcast to clients.
    Broadcast(ServerEvent),
}

/// Handle for publishing and subscribing to [`LocalEvent`]s.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct LocalEvents {
    tx: broadcast::Sender<LocalEvent>,
}

impl LocalEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event. A send with no live subscribers is not an
    /// error — observers are optional.
    pub fn emit(&self, event: LocalEvent) {
        let _ = self.tx.send(event);
    }

    /// Opens a new subscription. Events published before this call are
    /// not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<LocalEvent> {
        self.tx.subscribe()
    }
}

impl Default for LocalEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// =========================================================================
// Tests
// =========================================================================
