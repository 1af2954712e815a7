//! Client session registry and broadcast fan-out.
//!
//! This crate owns who is connected and how events reach them:
//!
//! - [`ClientRegistry`] — the table of live sessions, keyed by session id,
//!   with each session's outbound event queue and last known player state.
//! - [`BroadcastRouter`] — fan-out of a [`ServerEvent`] to every session
//!   (optionally excluding the originator), with failed recipients removed
//!   from the registry and announced as departures.
//! - [`LocalEvents`] — an in-process side channel for embedders: every
//!   broadcast, session creation, state change, and handler error is
//!   surfaced here without going over the wire.
//!
//! # Concurrency note
//!
//! `ClientRegistry` is NOT thread-safe by itself — it uses a plain
//! `HashMap` and is meant to be owned behind a single lock (or by a single
//! task) at a higher level. Delivery never blocks on a slow client: each
//! session's outbound queue is an unbounded channel drained by that
//! connection's handler task.

mod error;
mod events;
mod registry;
mod router;
mod session;

pub use error::RegistryError;
pub use events::{LocalEvent, LocalEvents};
pub use registry::ClientRegistry;
pub use router::{BroadcastRouter, BroadcastScope};
pub use session::{Session, SessionSender};

pub use voxelcast_protocol::ServerEvent;
