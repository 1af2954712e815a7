//! Voxel world layer for Voxelcast.
//!
//! The sync server treats the world as an external collaborator: something
//! that owns block state and chunk partitioning and exposes block
//! read/write plus chunk enumeration. This crate defines that boundary
//! ([`WorldEngine`]) together with the chunk data model and the chunk
//! compression codec, and ships [`GridWorld`] — a small in-memory engine
//! that is enough world for demos and integration tests.
//!
//! # Key types
//!
//! - [`WorldEngine`] — block mutation, chunk lookup, chunk enumeration
//! - [`Chunk`] / [`ChunkKey`] — a fixed-size voxel partition and its
//!   stable grid identity
//! - [`ChunkCodec`] / [`RleCodec`] — pure voxel-array compression
//! - [`GridWorld`] — flat-terrain in-memory [`WorldEngine`]

mod chunk;
mod codec;
mod engine;
mod error;

pub use chunk::{Chunk, ChunkKey};
pub use codec::{ChunkCodec, RleCodec};
pub use engine::{GridWorld, WorldEngine};
pub use error::WorldError;
