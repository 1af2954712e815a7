//! Error types for the world layer.

use voxelcast_protocol::BlockPos;

/// Errors that can occur during world mutation.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// No chunk owns the given position — the edit lands outside the
    /// generated world. Surfaced to embedders as a `missing chunk`
    /// notification rather than a client-visible error.
    #[error("no chunk owns position {0}")]
    NoChunk(BlockPos),
}
