//! Wire protocol for Voxelcast.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`SessionId`], etc.) —
//!   the event structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the session
//! registry (player identity). It doesn't know about connections, chunks,
//! or broadcasting — it only knows how to name and serialize events.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent / ServerEvent) → Registry
//! ```
//!
//! Every inbound and outbound event is a variant of a closed enum, so
//! dispatch on the server side is an exhaustive `match` — there is no
//! string-keyed event table that can silently miss a case.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    BlockPos, ChunkMeta, ClientEvent, GameSettings, PlayerState, ServerEvent,
    SessionId, Vec3, CHAT_MAX_CHARS,
};
