//! The world engine boundary and the in-memory implementation.

use std::collections::HashMap;

use tracing::debug;
use voxelcast_protocol::BlockPos;

use crate::{Chunk, ChunkKey, WorldError};

/// Owns block state and chunk partitioning.
///
/// The sync server only needs three things from a world: mutate a block,
/// look chunks up, and enumerate them for the initial transfer. Everything
/// else (generation, physics, raycasting) stays behind this trait.
pub trait WorldEngine: Send + Sync + 'static {
    /// Reads the block at a world position, or `None` if no chunk owns it.
    fn get_block(&self, pos: BlockPos) -> Option<u16>;

    /// Writes the block at a world position.
    ///
    /// Returns the key of the owning chunk so callers can invalidate any
    /// cached payload for it.
    ///
    /// # Errors
    /// [`WorldError::NoChunk`] when the position lies outside every chunk.
    fn set_block(&mut self, pos: BlockPos, value: u16) -> Result<ChunkKey, WorldError>;

    /// Looks up a chunk by its grid key.
    fn chunk(&self, key: &ChunkKey) -> Option<&Chunk>;

    /// Every chunk key in the world, for the initial full-world transfer.
    /// Order is unspecified.
    fn chunk_keys(&self) -> Vec<ChunkKey>;
}

// ---------------------------------------------------------------------------
// GridWorld
// ---------------------------------------------------------------------------

/// An in-memory [`WorldEngine`]: a fixed square of cubic chunks around the
/// origin with a flat ground plane. Enough world to drive demos and the
/// integration tests; a real game plugs in its own engine.
pub struct GridWorld {
    chunk_size: u32,
    chunks: HashMap<ChunkKey, Chunk>,
}

impl GridWorld {
    /// Generates a `(2*radius+1)²` grid of chunks at `y = 0`, with the
    /// bottom `ground_height` block layers filled with `ground_value`.
    pub fn flat(chunk_size: u32, radius: i32, ground_height: u32, ground_value: u16) -> Self {
        let dims = [chunk_size, chunk_size, chunk_size];
        let mut chunks = HashMap::new();

        for cx in -radius..=radius {
            for cz in -radius..=radius {
                let key = ChunkKey::new(cx, 0, cz);
                let mut chunk = Chunk::empty(key, dims);
                let ground = ground_height.min(chunk_size) as usize;
                for lz in 0..chunk_size as usize {
                    for ly in 0..ground {
                        for lx in 0..chunk_size as usize {
                            let idx = lx
                                + chunk_size as usize * (ly + chunk_size as usize * lz);
                            chunk.set_index(idx, ground_value);
                        }
                    }
                }
                chunks.insert(key, chunk);
            }
        }

        debug!(
            chunks = chunks.len(),
            chunk_size, "generated flat grid world"
        );
        Self { chunk_size, chunks }
    }

    /// Blocks per chunk side.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Number of chunks in the world.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl WorldEngine for GridWorld {
    fn get_block(&self, pos: BlockPos) -> Option<u16> {
        let key = ChunkKey::containing(pos, self.chunk_size);
        self.chunks.get(&key).and_then(|c| c.get(pos))
    }

    fn set_block(&mut self, pos: BlockPos, value: u16) -> Result<ChunkKey, WorldError> {
        let key = ChunkKey::containing(pos, self.chunk_size);
        let chunk = self.chunks.get_mut(&key).ok_or(WorldError::NoChunk(pos))?;
        chunk.set(pos, value);
        Ok(key)
    }

    fn chunk(&self, key: &ChunkKey) -> Option<&Chunk> {
        self.chunks.get(key)
    }

    fn chunk_keys(&self) -> Vec<ChunkKey> {
        self.chunks.keys().copied().collect()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn small_world() -> GridWorld {
        // 3×3 grid of 8³ chunks, 2 ground layers of value 1.
        GridWorld::flat(8, 1, 2, 1)
    }

    #[test]
    fn test_flat_world_chunk_count() {
        assert_eq!(small_world().chunk_count(), 9);
    }

    #[test]
    fn test_flat_world_has_ground_and_air() {
        let world = small_world();
        assert_eq!(world.get_block(BlockPos::new(0, 0, 0)), Some(1));
        assert_eq!(world.get_block(BlockPos::new(0, 1, 0)), Some(1));
        assert_eq!(world.get_block(BlockPos::new(0, 2, 0)), Some(0));
    }

    #[test]
    fn test_set_block_returns_owning_chunk_key() {
        let mut world = small_world();
        let key = world.set_block(BlockPos::new(-3, 4, 5), 7).unwrap();
        assert_eq!(key, ChunkKey::new(-1, 0, 0));
        assert_eq!(world.get_block(BlockPos::new(-3, 4, 5)), Some(7));
    }

    #[test]
    fn test_set_block_outside_world_is_no_chunk() {
        let mut world = small_world();
        // y = 100 is far above the single chunk layer.
        let result = world.set_block(BlockPos::new(0, 100, 0), 1);
        assert!(matches!(result, Err(WorldError::NoChunk(_))));
    }

    #[test]
    fn test_chunk_keys_enumerates_every_chunk() {
        let world = small_world();
        let keys = world.chunk_keys();
        assert_eq!(keys.len(), 9);
        assert!(keys.contains(&ChunkKey::new(-1, 0, -1)));
        assert!(keys.contains(&ChunkKey::new(1, 0, 1)));
    }

    #[test]
    fn test_chunk_lookup_by_key() {
        let world = small_world();
        let chunk = world.chunk(&ChunkKey::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.dims(), [8, 8, 8]);
        assert!(world.chunk(&ChunkKey::new(5, 5, 5)).is_none());
    }
}
