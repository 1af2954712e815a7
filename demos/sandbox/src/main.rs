//! Sandbox demo: a runnable Voxelcast server over a small flat world.
//!
//! Connect any WebSocket client to ws://127.0.0.1:8080 and speak the JSON
//! protocol: send `{"type":"Created"}` to receive the world, then `State`,
//! `SetBlock`, and `Chat` events. The demo also shows the embedding side:
//! it subscribes to the server's local notifications and logs them.

use voxelcast::prelude::*;

// ---------------------------------------------------------------------------
// World setup
// ---------------------------------------------------------------------------

/// 5×5 grid of 16³ chunks with four ground layers of grass.
fn build_world() -> GridWorld {
    GridWorld::flat(16, 2, 4, 1)
}

fn settings() -> GameSettings {
    GameSettings {
        materials: vec![
            "grass".to_string(),
            "dirt".to_string(),
            "stone".to_string(),
            "plank".to_string(),
        ],
        world_origin: BlockPos::new(0, 0, 0),
        avatar_initial_position: Vec3::new(0.0, 6.0, 0.0),
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), VoxelcastError> {
    voxelcast::init_tracing();

    let server = VoxelcastServerBuilder::new()
        .bind("0.0.0.0:8080")
        .settings(settings())
        .allow_forward("emote")
        .build(build_world(), RleCodec)
        .await?;

    tracing::info!("sandbox server on 0.0.0.0:8080");

    // The embedding side: react to server notifications. A real game
    // would spawn avatars on ClientCreated and generate terrain on
    // MissingChunk; the sandbox just logs them.
    let mut events = server.local_events().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(LocalEvent::ClientCreated(id)) => {
                    tracing::info!(%id, "client finished world transfer");
                }
                Ok(LocalEvent::MissingChunk(pos)) => {
                    tracing::info!(%pos, "edit outside the generated world");
                }
                Ok(LocalEvent::HandlerError { id, message }) => {
                    tracing::warn!(%id, message, "client event failed");
                }
                Ok(_) => {}
                // Skipped past events while busy; keep going.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    server.run().await
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start() -> String {
        let server = VoxelcastServerBuilder::new()
            .bind("127.0.0.1:0")
            .settings(settings())
            .allow_forward("emote")
            .build(build_world(), RleCodec)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    async fn recv(ws: &mut Ws) -> ServerEvent {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();
        serde_json::from_slice(&msg.into_data()).unwrap()
    }

    #[tokio::test]
    async fn test_sandbox_greets_with_demo_settings() {
        let addr = start().await;
        let (mut ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();

        assert!(matches!(recv(&mut ws).await, ServerEvent::Id { .. }));
        match recv(&mut ws).await {
            ServerEvent::Settings { settings } => {
                assert_eq!(settings.materials.len(), 4);
                assert_eq!(
                    settings.avatar_initial_position,
                    Vec3::new(0.0, 6.0, 0.0)
                );
            }
            other => panic!("expected Settings, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sandbox_streams_25_chunks() {
        let addr = start().await;
        let (mut ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
        let _ = recv(&mut ws).await; // Id
        let _ = recv(&mut ws).await; // Settings

        let created = serde_json::to_vec(&ClientEvent::Created).unwrap();
        ws.send(Message::Binary(created.into())).await.unwrap();

        let mut chunks = 0;
        loop {
            match recv(&mut ws).await {
                ServerEvent::Chunk { .. } => chunks += 1,
                ServerEvent::NoMoreChunks { complete } => {
                    assert!(complete);
                    break;
                }
                _ => {} // periodic updates interleave
            }
        }
        assert_eq!(chunks, 25);
    }
}
