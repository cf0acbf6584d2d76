use super::codec::LineCodec;
use super::protocol::{Handshake, SharedState, StateRecord};
use crate::game::{Board, Side};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{tcp::OwnedWriteHalf, TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Relay that mediates exactly two endpoints around one shared snapshot.
///
/// The first connection becomes the left, physics-authoritative player, the
/// second the right, mirroring one. Each inbound record is merged into the
/// shared state under its mutex and the merged result is echoed back to the
/// sender only; the peer picks the update up on its own next exchange.
pub struct Relay {
    listener: TcpListener,
    board: Board,
    state: Arc<Mutex<SharedState>>,
}

impl Relay {
    /// Bind the listen socket without accepting anyone yet.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        let board = Board::default();

        Ok(Self {
            state: Arc::new(Mutex::new(SharedState::new(&board))),
            listener,
            board,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listener address")
    }

    /// Accept exactly two players, run their handlers to completion, then
    /// return. No third connection is ever accepted and no reconnection is
    /// supported; a new match means a new relay process.
    pub async fn run(self) -> Result<()> {
        info!("Relay listening on {}", self.local_addr()?);
        info!("Waiting for 2 players...");

        let mut handles = Vec::with_capacity(2);
        for side in [Side::Left, Side::Right] {
            let (mut stream, peer_addr) = self
                .listener
                .accept()
                .await
                .context("Failed to accept connection")?;

            let handshake = Handshake::new(&self.board, side);
            let line = LineCodec::encode(&serde_json::to_string(&handshake)?);
            stream
                .write_all(line.as_bytes())
                .await
                .with_context(|| format!("Failed to send handshake to {}", peer_addr))?;

            info!("Player connected from {} as {} paddle", peer_addr, side);

            let state = self.state.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = handle_player(stream, side, state).await {
                    error!("Player {} connection error: {}", side, e);
                }
                info!("Player {} disconnected", side);
            }));
        }

        // Capacity is exactly two: further connection attempts sit in the
        // backlog and are torn down here rather than displacing a player.
        drop(self.listener);
        info!("Both players connected! Game starting...");

        for handle in handles {
            let _ = handle.await;
        }
        info!("Match over, relay shutting down");
        Ok(())
    }
}

/// Per-connection loop: read chunks through the framing codec, merge each
/// parsed record into the shared state inside one critical section, and echo
/// the merged snapshot back to this sender.
async fn handle_player(
    stream: TcpStream,
    side: Side,
    state: Arc<Mutex<SharedState>>,
) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();
    let mut codec = LineCodec::new();
    let mut buf = [0u8; 1024];

    loop {
        let n = reader.read(&mut buf).await.context("Read failed")?;
        if n == 0 {
            break; // Connection closed
        }

        for record in codec.feed(&buf[..n]) {
            let rec: StateRecord = match serde_json::from_str(&record) {
                Ok(rec) => rec,
                Err(e) => {
                    warn!("Dropping malformed record from {}: {} - '{}'", side, e, record);
                    continue;
                }
            };
            debug!("Received from {}: sync {}", side, rec.sync_or_zero());

            // Whole read-merge-copy sequence under one lock, never partially
            let echo = {
                let mut shared = state.lock().await;
                shared.apply(side, &rec);
                shared.to_record()
            };
            send_record(&mut writer, &echo).await?;
        }
    }

    Ok(())
}

async fn send_record(writer: &mut OwnedWriteHalf, rec: &StateRecord) -> Result<()> {
    let line = LineCodec::encode(&serde_json::to_string(rec)?);
    writer
        .write_all(line.as_bytes())
        .await
        .context("Write failed")?;
    Ok(())
}
