//! Core protocol types for Voxelcast's wire format.
//!
//! This module defines every type that travels "on the wire" — the
//! structures that get serialized to bytes, sent over the network, and
//! deserialized on the other side.
//!
//! The two top-level enums mirror the two directions of traffic:
//! [`ClientEvent`] (client → server) and [`ServerEvent`] (server → client
//! or server → all). Both are internally tagged (`#[serde(tag = "type")]`)
//! so the JSON shape is `{ "type": "Chat", "text": "..." }` — easy to
//! produce and inspect from a browser client.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of characters a chat message may carry on the wire.
/// Longer inputs are truncated by the server, never rejected.
pub const CHAT_MAX_CHARS: usize = 140;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a connected session.
///
/// Opaque to clients: the server either honors an id the client supplies
/// (if it doesn't collide) or generates a random 32-hex-char one. The
/// newtype keeps session ids from being confused with other strings such
/// as chat text or forwarded event names.
///
/// `#[serde(transparent)]` serializes this as the bare string, so a
/// `SessionId("ab12")` becomes `"ab12"` in JSON, not `{"0":"ab12"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Wraps an existing string as a session id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A 3-component float vector: player positions and rotations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Linear interpolation: `self + t * (toward - self)`.
    ///
    /// `t = 0` returns `self`, `t = 1` returns `toward`.
    pub fn lerp(&self, toward: &Vec3, t: f32) -> Vec3 {
        Vec3 {
            x: self.x + t * (toward.x - self.x),
            y: self.y + t * (toward.y - self.y),
            z: self.z + t * (toward.z - self.z),
        }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Integral world coordinate of a single voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{}]", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// The per-session player state the server tracks and rebroadcasts.
///
/// Both vectors start at zero when a session is created; the client is
/// expected to move itself to the configured spawn point and report back
/// via `State` events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerState {
    pub position: Vec3,
    pub rotation: Vec3,
}

// ---------------------------------------------------------------------------
// Game settings
// ---------------------------------------------------------------------------

/// Immutable world configuration pushed to each client right after its id.
///
/// Merged once at server startup; the sync layer treats it as an opaque
/// read-only blob apart from serializing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Material palette, indexed by block value (value 1 = materials[0]).
    pub materials: Vec<String>,
    /// World origin in block coordinates.
    pub world_origin: BlockPos,
    /// Where freshly spawned avatars should be placed.
    pub avatar_initial_position: Vec3,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            materials: vec!["grass".into(), "dirt".into(), "stone".into()],
            world_origin: BlockPos::new(0, 0, 0),
            avatar_initial_position: Vec3::new(0.0, 4.0, 0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Chunk transfer metadata
// ---------------------------------------------------------------------------

/// Shape information a client needs to decode a compressed chunk payload.
///
/// The payload itself is an opaque byte string produced by the chunk
/// codec; `dims` and `length` describe the original voxel array so the
/// client can rebuild it after decompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Chunk grid coordinate (not a block position).
    pub position: [i32; 3],
    /// Voxel array dimensions along x/y/z.
    pub dims: [u32; 3],
    /// Total voxel count (`dims[0] * dims[1] * dims[2]`).
    pub length: u32,
}

// ---------------------------------------------------------------------------
// ClientEvent — client → server
// ---------------------------------------------------------------------------

/// Every event a client may send.
///
/// Decoded at the channel boundary and dispatched with an exhaustive
/// `match`; unknown `type` tags fail decoding and are dropped by the
/// connection handler without disconnecting the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// The client finished local setup and wants the world streamed to it.
    Created,

    /// A chat line. Text longer than [`CHAT_MAX_CHARS`] is truncated
    /// server-side; empty text is silently ignored.
    Chat { text: String },

    /// The client's self-reported position and rotation.
    State { position: Vec3, rotation: Vec3 },

    /// A block edit at a world position.
    SetBlock { position: BlockPos, value: u16 },

    /// An application-defined event to be forwarded to other sessions.
    /// Only names on the server's allow-list are re-broadcast.
    Custom {
        name: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
}

// ---------------------------------------------------------------------------
// ServerEvent — server → client(s)
// ---------------------------------------------------------------------------

/// Every event the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// The assigned session identifier. First event on every connection.
    Id { id: SessionId },

    /// World configuration. Second event on every connection.
    Settings { settings: GameSettings },

    /// Another session joined.
    Join { id: SessionId },

    /// Another session left (or was dropped after a send failure).
    Leave { id: SessionId },

    /// One compressed chunk of the initial world transfer.
    Chunk { payload: Vec<u8>, meta: ChunkMeta },

    /// End-of-chunks marker terminating the initial world transfer.
    /// `complete` is always `true`; it exists as an explicit sentinel
    /// rather than an empty event.
    NoMoreChunks { complete: bool },

    /// A chat line, already truncated to [`CHAT_MAX_CHARS`].
    Chat { text: String },

    /// A block edit made by `origin`, fanned out to everyone else.
    SetBlock {
        position: BlockPos,
        value: u16,
        origin: SessionId,
    },

    /// Periodic state snapshot: every live session's player state.
    Update {
        positions: HashMap<SessionId, PlayerState>,
        /// Milliseconds since the server started, at snapshot time.
        timestamp: u64,
    },

    /// An allow-listed custom event, re-broadcast with the originating
    /// session id prepended.
    Custom {
        name: String,
        origin: SessionId,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
}

// =========================================================================
// Tests
// =========================================================================
