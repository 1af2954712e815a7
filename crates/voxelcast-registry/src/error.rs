//! Error types for the registry layer.

use voxelcast_protocol::SessionId;

/// Errors that can occur in registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A session with this id is already registered.
    #[error("session id already in use: {0}")]
    DuplicateId(SessionId),

    /// No session with this id is registered.
    #[error("no such session: {0}")]
    NotFound(SessionId),

    /// The session's outbound queue is closed — its writer task is gone.
    /// Treated as terminal for the session.
    #[error("outbound channel closed for session {0}")]
    ChannelClosed(SessionId),
}
