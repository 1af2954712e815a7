//! Unified error type for the Voxelcast server.

use voxelcast_protocol::ProtocolError;
use voxelcast_registry::RegistryError;
use voxelcast_transport::TransportError;
use voxelcast_world::WorldError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `voxelcast` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum VoxelcastError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry-level error (duplicate id, unknown session, dead queue).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A world-level error (edit outside every chunk).
    #[error(transparent)]
    World(#[from] WorldError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxelcast_protocol::{BlockPos, SessionId};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let top: VoxelcastError = err.into();
        assert!(matches!(top, VoxelcastError::Transport(_)));
        assert!(top.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidEvent("bad".into());
        let top: VoxelcastError = err.into();
        assert!(matches!(top, VoxelcastError::Protocol(_)));
    }

    #[test]
    fn test_from_registry_error() {
        let err = RegistryError::NotFound(SessionId::new("ghost"));
        let top: VoxelcastError = err.into();
        assert!(matches!(top, VoxelcastError::Registry(_)));
    }

    #[test]
    fn test_from_world_error() {
        let err = WorldError::NoChunk(BlockPos::new(0, 99, 0));
        let top: VoxelcastError = err.into();
        assert!(matches!(top, VoxelcastError::World(_)));
    }
}
