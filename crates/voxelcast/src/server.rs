//! `VoxelcastServer` builder and server loop.
//!
//! This is the entry point for running a Voxelcast sync server. It ties
//! together all the layers: transport → protocol → registry → world, plus
//! the periodic state-update broadcast.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use voxelcast_protocol::{Codec, GameSettings, JsonCodec, ServerEvent};
use voxelcast_registry::{BroadcastRouter, BroadcastScope, ClientRegistry, LocalEvents};
use voxelcast_tick::{TickConfig, TickScheduler};
use voxelcast_transport::{Transport, WebSocketTransport};
use voxelcast_world::{ChunkCodec, WorldEngine};

use crate::cache::ChunkCache;
use crate::handler::handle_connection;
use crate::VoxelcastError;

/// World state and its payload cache, guarded together.
///
/// One lock covers both so an edit and its cache invalidation are atomic
/// with respect to a concurrent full-world transfer.
pub(crate) struct WorldStore<W: WorldEngine, K: ChunkCodec> {
    pub(crate) world: W,
    pub(crate) cache: ChunkCache<K>,
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Interior
/// mutability via `Mutex` where needed. Lock order where both are taken:
/// `store` before `registry`.
pub(crate) struct ServerState<W: WorldEngine, K: ChunkCodec, C: Codec> {
    pub(crate) registry: Mutex<ClientRegistry>,
    pub(crate) router: BroadcastRouter,
    pub(crate) store: Mutex<WorldStore<W, K>>,
    pub(crate) settings: GameSettings,
    pub(crate) forward_allow: HashSet<String>,
    pub(crate) codec: C,
    epoch: Instant,
}

impl<W: WorldEngine, K: ChunkCodec, C: Codec> ServerState<W, K, C> {
    /// Milliseconds since the server started; the timestamp carried by
    /// `Update` broadcasts.
    pub(crate) fn timestamp(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting a Voxelcast server.
///
/// # Example
///
/// ```rust,ignore
/// use voxelcast::prelude::*;
///
/// let server = VoxelcastServer::builder()
///     .bind("0.0.0.0:8080")
///     .allow_forward("emote")
///     .build(GridWorld::flat(16, 2, 4, 1), RleCodec)
///     .await?;
/// server.run().await
/// ```
pub struct VoxelcastServerBuilder {
    bind_addr: String,
    settings: GameSettings,
    tick: TickConfig,
    forward_allow: HashSet<String>,
}

impl VoxelcastServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            settings: GameSettings::default(),
            tick: TickConfig::default(),
            forward_allow: HashSet::new(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the game settings sent to each client on connect.
    pub fn settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the period of the state-update broadcast (default 45 ms).
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.tick.period = period;
        self
    }

    /// Allows a named custom client event to be forwarded to the other
    /// clients. Events not on this list are ignored.
    pub fn allow_forward(mut self, name: impl Into<String>) -> Self {
        self.forward_allow.insert(name.into());
        self
    }

    /// Builds and starts the server over the given world and chunk codec.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` as defaults.
    pub async fn build<W, K>(
        self,
        world: W,
        chunk_codec: K,
    ) -> Result<VoxelcastServer<W, K, JsonCodec>, VoxelcastError>
    where
        W: WorldEngine,
        K: ChunkCodec,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(ClientRegistry::new()),
            router: BroadcastRouter::default(),
            store: Mutex::new(WorldStore {
                world,
                cache: ChunkCache::new(chunk_codec),
            }),
            settings: self.settings,
            forward_allow: self.forward_allow,
            codec: JsonCodec,
            epoch: Instant::now(),
        });

        Ok(VoxelcastServer {
            transport,
            state,
            tick: self.tick,
        })
    }
}

impl Default for VoxelcastServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Voxelcast sync server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct VoxelcastServer<W: WorldEngine, K: ChunkCodec, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<W, K, C>>,
    tick: TickConfig,
}

impl<W, K, C> VoxelcastServer<W, K, C>
where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> VoxelcastServerBuilder {
        VoxelcastServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Handle for subscribing to in-process server notifications
    /// (session lifecycle, handler errors, broadcast pass-through).
    pub fn local_events(&self) -> LocalEvents {
        self.state.router.observers().clone()
    }

    /// Runs the server: the update-broadcast task plus the accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), VoxelcastError> {
        tracing::info!("Voxelcast server running");

        let tick_state = Arc::clone(&self.state);
        tokio::spawn(run_update_loop(tick_state, self.tick.clone()));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// The periodic state-update broadcast.
///
/// Each tick snapshots every session's player state and fans it out. An
/// idle server (no sessions) produces no wire traffic at all.
async fn run_update_loop<W, K, C>(state: Arc<ServerState<W, K, C>>, tick: TickConfig)
where
    W: WorldEngine,
    K: ChunkCodec,
    C: Codec,
{
    let mut scheduler = TickScheduler::new(tick);
    loop {
        scheduler.wait_for_tick().await;

        let mut registry = state.registry.lock().await;
        if registry.is_empty() {
            continue;
        }
        let positions = registry.snapshot();
        state.router.broadcast(
            &mut registry,
            BroadcastScope::All,
            ServerEvent::Update {
                positions,
                timestamp: state.timestamp(),
            },
        );
    }
}
