//! Per-connection handler: session setup and client event dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register a session → send `Id` then `Settings`, announce `Join`
//!   2. Loop: inbound frames are decoded and dispatched; the session's
//!      outbound queue is pumped onto the socket
//!   3. Any exit path removes the session and announces `Leave`
//!
//! A handler fault never kills the session: the error becomes a
//! [`LocalEvent::HandlerError`] notification and the loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use voxelcast_protocol::{
    ClientEvent, Codec, ServerEvent, SessionId, Vec3, CHAT_MAX_CHARS,
};
use voxelcast_registry::{BroadcastScope, LocalEvent};
use voxelcast_transport::{Connection, WebSocketConnection};
use voxelcast_world::{ChunkCodec, WorldEngine, WorldError};

use crate::server::ServerState;
use crate::VoxelcastError;

/// A connection with no inbound frames for this long is dropped.
const RECV_TIMEOUT: Duration = Duration::from_secs(15);

/// Reported deltas beyond this distance are smoothed instead of committed.
const SMOOTH_THRESHOLD: f32 = 20.0;

/// Fraction of an excessive delta that is committed per report.
const SMOOTH_FACTOR: f32 = 0.1;

/// Drop guard that removes the session when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct SessionGuard<W: WorldEngine, K: ChunkCodec, C: Codec> {
    id: SessionId,
    state: Arc<ServerState<W, K, C>>,
}

impl<W: WorldEngine, K: ChunkCodec, C: Codec> Drop for SessionGuard<W, K, C> {
    fn drop(&mut self) {
        let id = self.id.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut registry = state.registry.lock().await;
            state.router.drop_session(&mut registry, &id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<W, K, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<W, K, C>>,
) -> Result<(), VoxelcastError>
where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: register the session, greet, announce ---
    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel();

    let id = {
        let mut registry = state.registry.lock().await;
        let id = registry.add_session(outbound_tx, None)?;
        registry.send_to(&id, ServerEvent::Id { id: id.clone() })?;
        registry.send_to(
            &id,
            ServerEvent::Settings {
                settings: state.settings.clone(),
            },
        )?;
        state.router.broadcast(
            &mut registry,
            BroadcastScope::Except(&id),
            ServerEvent::Join { id: id.clone() },
        );
        id
    };
    let _guard = SessionGuard {
        id: id.clone(),
        state: Arc::clone(&state),
    };

    tracing::info!(%conn_id, %id, "session connected");

    // --- Step 2: event loop ---
    // One task owns both directions: inbound frames are dispatched, the
    // session's outbound queue is drained onto the socket. The deadline
    // only moves when the client sends something, so a server chatty with
    // updates still times out a silent client.
    let mut deadline = TokioInstant::now() + RECV_TIMEOUT;

    loop {
        tokio::select! {
            _ = time::sleep_until(deadline) => {
                tracing::info!(%id, "connection timed out");
                break;
            }

            inbound = conn.recv() => match inbound {
                Ok(Some(data)) => {
                    deadline = TokioInstant::now() + RECV_TIMEOUT;
                    dispatch_frame(&state, &id, &data).await;
                }
                Ok(None) => {
                    tracing::info!(%id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%id, error = %e, "recv error");
                    break;
                }
            },

            outbound = outbound_rx.recv() => match outbound {
                Some(event) => {
                    let bytes = state.codec.encode(&event)?;
                    if let Err(e) = conn.send(&bytes).await {
                        // Terminal: no retry at this layer.
                        tracing::debug!(%id, error = %e, "send failed");
                        break;
                    }
                }
                None => {
                    // The registry dropped this session (e.g. the router
                    // found the queue dead) — close the socket too.
                    tracing::debug!(%id, "session removed, closing");
                    break;
                }
            },
        }
    }

    let _ = conn.close().await;
    // _guard drops here → session removal and Leave announcement fire.
    Ok(())
}

/// Decodes and dispatches one inbound frame. Faults are surfaced as
/// `HandlerError` notifications; the session stays connected.
async fn dispatch_frame<W, K, C>(
    state: &Arc<ServerState<W, K, C>>,
    id: &SessionId,
    data: &[u8],
) where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    let event: ClientEvent = match state.codec.decode(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%id, error = %e, "failed to decode client event");
            state.router.observers().emit(LocalEvent::HandlerError {
                id: id.clone(),
                message: e.to_string(),
            });
            return;
        }
    };

    if let Err(e) = handle_event(state, id, event).await {
        tracing::warn!(%id, error = %e, "client event handler failed");
        state.router.observers().emit(LocalEvent::HandlerError {
            id: id.clone(),
            message: e.to_string(),
        });
    }
}

/// Exhaustive dispatch over the client event vocabulary.
async fn handle_event<W, K, C>(
    state: &Arc<ServerState<W, K, C>>,
    id: &SessionId,
    event: ClientEvent,
) -> Result<(), VoxelcastError>
where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    match event {
        ClientEvent::Created => handle_created(state, id).await,
        ClientEvent::Chat { text } => handle_chat(state, &text).await,
        ClientEvent::State { position, rotation } => {
            handle_state(state, id, position, rotation).await
        }
        ClientEvent::SetBlock { position, value } => {
            handle_set_block(state, id, position, value).await
        }
        ClientEvent::Custom { name, args } => {
            handle_custom(state, id, name, args).await
        }
    }
}

/// `Created`: stream the full world to this session — one `Chunk` event
/// per existing chunk (payloads via the cache), then the end-of-transfer
/// marker. Re-sending on a repeated `Created` is harmless.
async fn handle_created<W, K, C>(
    state: &Arc<ServerState<W, K, C>>,
    id: &SessionId,
) -> Result<(), VoxelcastError>
where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    // Encode everything under the store lock, deliver under the registry
    // lock. Lock order: store before registry.
    let chunks = {
        let mut store = state.store.lock().await;
        let store = &mut *store;
        let keys = store.world.chunk_keys();
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(chunk) = store.world.chunk(&key) {
                let meta = chunk.meta();
                let payload = store.cache.get_or_encode(chunk);
                out.push((payload, meta));
            }
        }
        out
    };

    let count = chunks.len();
    {
        let registry = state.registry.lock().await;
        for (payload, meta) in chunks {
            registry.send_to(
                id,
                ServerEvent::Chunk {
                    payload: payload.to_vec(),
                    meta,
                },
            )?;
        }
        registry.send_to(id, ServerEvent::NoMoreChunks { complete: true })?;
    }

    tracing::info!(%id, chunks = count, "world transfer queued");
    state
        .router
        .observers()
        .emit(LocalEvent::ClientCreated(id.clone()));
    Ok(())
}

/// `Chat`: empty text is ignored, anything longer than 140 characters is
/// truncated, and the result goes to everyone including the sender.
async fn handle_chat<W, K, C>(
    state: &Arc<ServerState<W, K, C>>,
    text: &str,
) -> Result<(), VoxelcastError>
where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    let Some(text) = clamp_chat(text) else {
        return Ok(());
    };
    let mut registry = state.registry.lock().await;
    state
        .router
        .broadcast(&mut registry, BroadcastScope::All, ServerEvent::Chat { text });
    Ok(())
}

/// `State`: commit the reported rotation's yaw/pitch (x/y) and the
/// reported position, smoothed when the jump is implausibly large. The
/// corrected value reaches every client (the origin included) with the
/// next periodic `Update` broadcast — there is no dedicated push-back.
async fn handle_state<W, K, C>(
    state: &Arc<ServerState<W, K, C>>,
    id: &SessionId,
    position: Vec3,
    rotation: Vec3,
) -> Result<(), VoxelcastError>
where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    let updated = {
        let mut registry = state.registry.lock().await;
        registry.update_player(id, |player| {
            // Only yaw/pitch replicate; rotation z stays untouched.
            player.rotation.x = rotation.x;
            player.rotation.y = rotation.y;
            player.position = smooth_position(player.position, position);
        })
    };

    if updated {
        state
            .router
            .observers()
            .emit(LocalEvent::ClientState(id.clone()));
    }
    Ok(())
}

/// `SetBlock`: mutate the world, invalidate the owning chunk's cached
/// payload, and tell everyone but the editor. An edit outside the world
/// becomes a `MissingChunk` notification instead of an error.
async fn handle_set_block<W, K, C>(
    state: &Arc<ServerState<W, K, C>>,
    id: &SessionId,
    position: voxelcast_protocol::BlockPos,
    value: u16,
) -> Result<(), VoxelcastError>
where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    let edit = {
        let mut store = state.store.lock().await;
        match store.world.set_block(position, value) {
            Ok(key) => {
                store.cache.invalidate(&key);
                Ok(())
            }
            Err(WorldError::NoChunk(pos)) => Err(pos),
        }
    };

    match edit {
        Ok(()) => {
            let mut registry = state.registry.lock().await;
            state.router.broadcast(
                &mut registry,
                BroadcastScope::Except(id),
                ServerEvent::SetBlock {
                    position,
                    value,
                    origin: id.clone(),
                },
            );
        }
        Err(pos) => {
            tracing::debug!(%id, %pos, "block edit outside world");
            state
                .router
                .observers()
                .emit(LocalEvent::MissingChunk(pos));
        }
    }
    Ok(())
}

/// `Custom`: forwarded to the other clients with the origin id prepended,
/// but only for event names on the configured allow-list.
async fn handle_custom<W, K, C>(
    state: &Arc<ServerState<W, K, C>>,
    id: &SessionId,
    name: String,
    args: Vec<serde_json::Value>,
) -> Result<(), VoxelcastError>
where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    if !state.forward_allow.contains(&name) {
        tracing::debug!(%id, name, "ignoring non-forwarded custom event");
        return Ok(());
    }
    let mut registry = state.registry.lock().await;
    state.router.broadcast(
        &mut registry,
        BroadcastScope::Except(id),
        ServerEvent::Custom {
            name,
            origin: id.clone(),
            args,
        },
    );
    Ok(())
}

/// Truncates chat text to the wire limit; `None` for empty input.
fn clamp_chat(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(CHAT_MAX_CHARS).collect())
}

/// Positions within [`SMOOTH_THRESHOLD`] of the stored one commit
/// verbatim; anything farther moves the stored position a
/// [`SMOOTH_FACTOR`] fraction toward the proposal.
fn smooth_position(stored: Vec3, proposed: Vec3) -> Vec3 {
    if stored.distance(&proposed) > SMOOTH_THRESHOLD {
        stored.lerp(&proposed, SMOOTH_FACTOR)
    } else {
        proposed
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -- clamp_chat ---------------------------------------------------------

    #[test]
    fn test_clamp_chat_empty_is_ignored() {
        assert_eq!(clamp_chat(""), None);
    }

    #[test]
    fn test_clamp_chat_short_text_unchanged() {
        assert_eq!(clamp_chat("hello").as_deref(), Some("hello"));
    }

    #[test]
    fn test_clamp_chat_truncates_at_140_chars() {
        let long = "x".repeat(300);
        let clamped = clamp_chat(&long).unwrap();
        assert_eq!(clamped.chars().count(), 140);
    }

    #[test]
    fn test_clamp_chat_exactly_140_chars_unchanged() {
        let text = "y".repeat(140);
        assert_eq!(clamp_chat(&text).as_deref(), Some(text.as_str()));
    }

    #[test]
    fn test_clamp_chat_counts_chars_not_bytes() {
        // Multi-byte characters: 150 of them is 150 chars, not 450 bytes.
        let text = "é".repeat(150);
        let clamped = clamp_chat(&text).unwrap();
        assert_eq!(clamped.chars().count(), 140);
    }

    // -- smooth_position ----------------------------------------------------

    #[test]
    fn test_smooth_position_small_delta_commits_verbatim() {
        let stored = Vec3::new(1.0, 2.0, 3.0);
        let proposed = Vec3::new(4.0, 2.0, 3.0); // 3 units away
        assert_eq!(smooth_position(stored, proposed), proposed);
    }

    #[test]
    fn test_smooth_position_at_threshold_commits_verbatim() {
        let stored = Vec3::ZERO;
        let proposed = Vec3::new(20.0, 0.0, 0.0); // exactly 20, not beyond
        assert_eq!(smooth_position(stored, proposed), proposed);
    }

    #[test]
    fn test_smooth_position_large_delta_moves_one_tenth() {
        let stored = Vec3::ZERO;
        let proposed = Vec3::new(100.0, 0.0, 0.0);
        let committed = smooth_position(stored, proposed);
        assert_eq!(committed, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_smooth_position_large_delta_from_nonzero_origin() {
        let stored = Vec3::new(10.0, 0.0, 0.0);
        let proposed = Vec3::new(10.0, 50.0, 0.0);
        let committed = smooth_position(stored, proposed);
        assert_eq!(committed, Vec3::new(10.0, 5.0, 0.0));
    }
}
