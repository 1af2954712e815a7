//! Chunk data model: a fixed-size voxel partition and its grid identity.

use std::fmt;

use voxelcast_protocol::{BlockPos, ChunkMeta};

// ---------------------------------------------------------------------------
// ChunkKey
// ---------------------------------------------------------------------------

/// The grid coordinate of a chunk — its stable identity.
///
/// Two chunks with the same key are the same chunk; the key is what the
/// transfer cache indexes payloads by. `Display` renders the canonical
/// `x|y|z` string form used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkKey {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The key of the chunk containing `pos`, for cubic chunks of
    /// `chunk_size` blocks per side. Uses floor division so negative
    /// coordinates land in the correct chunk.
    pub fn containing(pos: BlockPos, chunk_size: u32) -> Self {
        let s = chunk_size as i32;
        Self {
            x: pos.x.div_euclid(s),
            y: pos.y.div_euclid(s),
            z: pos.z.div_euclid(s),
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One fixed-size partition of the voxel world.
///
/// Voxels are stored x-fastest: `index = lx + dims[0] * (ly + dims[1] * lz)`
/// where `l*` are block coordinates local to the chunk. A value of 0 means
/// empty; nonzero values index the material palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    key: ChunkKey,
    dims: [u32; 3],
    voxels: Vec<u16>,
}

impl Chunk {
    /// Creates an all-empty chunk at `key`.
    pub fn empty(key: ChunkKey, dims: [u32; 3]) -> Self {
        let len = (dims[0] * dims[1] * dims[2]) as usize;
        Self {
            key,
            dims,
            voxels: vec![0; len],
        }
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn dims(&self) -> [u32; 3] {
        self.dims
    }

    /// The raw voxel array, in storage order.
    pub fn voxels(&self) -> &[u16] {
        &self.voxels
    }

    /// World-space block coordinate of this chunk's minimum corner.
    pub fn origin(&self) -> BlockPos {
        BlockPos::new(
            self.key.x * self.dims[0] as i32,
            self.key.y * self.dims[1] as i32,
            self.key.z * self.dims[2] as i32,
        )
    }

    /// Transfer metadata for this chunk's voxel array.
    pub fn meta(&self) -> ChunkMeta {
        ChunkMeta {
            position: [self.key.x, self.key.y, self.key.z],
            dims: self.dims,
            length: self.voxels.len() as u32,
        }
    }

    /// Index into the voxel array for a world position, or `None` when
    /// the position lies outside this chunk.
    pub fn index_of(&self, pos: BlockPos) -> Option<usize> {
        let origin = self.origin();
        let lx = pos.x - origin.x;
        let ly = pos.y - origin.y;
        let lz = pos.z - origin.z;
        if lx < 0
            || ly < 0
            || lz < 0
            || lx >= self.dims[0] as i32
            || ly >= self.dims[1] as i32
            || lz >= self.dims[2] as i32
        {
            return None;
        }
        let (lx, ly, lz) = (lx as usize, ly as usize, lz as usize);
        let (dx, dy) = (self.dims[0] as usize, self.dims[1] as usize);
        Some(lx + dx * (ly + dy * lz))
    }

    /// Reads the block at a world position.
    pub fn get(&self, pos: BlockPos) -> Option<u16> {
        self.index_of(pos).map(|i| self.voxels[i])
    }

    /// Writes the block at a world position. Returns `false` (and leaves
    /// the chunk untouched) when the position is outside this chunk.
    pub fn set(&mut self, pos: BlockPos, value: u16) -> bool {
        match self.index_of(pos) {
            Some(i) => {
                self.voxels[i] = value;
                true
            }
            None => false,
        }
    }

    /// Overwrites the voxel at a storage-order index. Used by world
    /// generation; panics on out-of-range indices like slice indexing.
    pub fn set_index(&mut self, index: usize, value: u16) {
        self.voxels[index] = value;
    }
}

// =========================================================================
// Tests
// =========================================================================
