//! # Voxelcast
//!
//! Multiplayer synchronization server for voxel worlds.
//!
//! Voxelcast keeps many connected clients in agreement about a shared
//! grid world: it assigns session identities, streams the world to new
//! arrivals, rebroadcasts block edits and chat, and fans out player
//! positions on a fixed cadence. The game itself — generation, physics,
//! rendering — stays on the other side of the
//! [`WorldEngine`](voxelcast_world::WorldEngine) trait and the local
//! notification channel.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use voxelcast::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), VoxelcastError> {
//!     let world = GridWorld::flat(16, 2, 4, 1);
//!     let server = VoxelcastServer::<GridWorld, RleCodec, JsonCodec>::builder()
//!         .bind("0.0.0.0:8080")
//!         .build(world, RleCodec)
//!         .await?;
//!     server.run().await
//! }
//! ```

mod cache;
mod error;
mod handler;
mod server;

pub use cache::ChunkCache;
pub use error::VoxelcastError;
pub use server::{VoxelcastServer, VoxelcastServerBuilder};

pub use voxelcast_protocol as protocol;
pub use voxelcast_registry as registry;
pub use voxelcast_tick as tick;
pub use voxelcast_transport as transport;
pub use voxelcast_world as world;

/// Initializes a `tracing` subscriber for server binaries: `RUST_LOG`
/// when set, `info` otherwise.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// The common imports for embedding a Voxelcast server.
pub mod prelude {
    pub use crate::{
        ChunkCache, VoxelcastError, VoxelcastServer, VoxelcastServerBuilder,
    };
    pub use voxelcast_protocol::{
        BlockPos, ChunkMeta, ClientEvent, Codec, GameSettings, JsonCodec,
        PlayerState, ServerEvent, SessionId, Vec3, CHAT_MAX_CHARS,
    };
    pub use voxelcast_registry::{LocalEvent, LocalEvents};
    pub use voxelcast_tick::{TickConfig, DEFAULT_PERIOD};
    pub use voxelcast_world::{
        Chunk, ChunkCodec, ChunkKey, GridWorld, RleCodec, WorldEngine,
        WorldError,
    };
}
