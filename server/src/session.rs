//! Per-connection session state and framed socket IO
//!
//! A `Session` owns one client's TCP stream, split into a read half used by
//! the session's handler task and a write half shared by everyone who sends
//! to the client (its own handler and broadcasts from other handlers).
//!
//! Concurrency rules:
//! - At most one receive at a time (receive lock on the read half)
//! - Sends are serialized by the send lock, so frames never interleave
//! - `disconnect` may be called from any task; it flips the connected flag
//!   once and wakes any receive or send blocked on this session
//! - a session attached to a server shutdown signal (`with_shutdown`)
//!   aborts blocked IO and disconnects itself once that signal fires, even
//!   while another task holds the registry lock
//!
//! Once disconnected a session is never reused: the socket halves are
//! dropped and every later send or receive fails immediately.

use crate::logging::Logger;
use protocol::{read_frame, write_frame, FrameError};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex as AsyncMutex};

/// Stable handle for a session inside the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Player identity attached to a session once login / join completes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub id: Option<u32>,
    pub x: i32,
    pub y: i32,
}

/// Server-side state for one connected client
pub struct Session {
    id: SessionId,
    peer: String,
    connected: AtomicBool,
    /// Flipped to true exactly once, by `disconnect`
    closed: watch::Sender<bool>,
    /// Server-wide stop signal, if any
    shutdown: Option<watch::Receiver<bool>>,
    reader: AsyncMutex<Option<OwnedReadHalf>>,
    writer: AsyncMutex<Option<OwnedWriteHalf>>,
    player: Mutex<Player>,
    log: Arc<dyn Logger>,
}

impl Session {
    /// Wraps an accepted connection.
    ///
    /// The stream is split into owned halves so a receive and a send can be
    /// in flight at the same time. `peer` is only kept as its IP text for
    /// log lines. The session starts connected with an empty player.
    pub fn new(id: SessionId, stream: TcpStream, peer: SocketAddr, log: Arc<dyn Logger>) -> Self {
        let (reader, writer) = stream.into_split();
        let (closed, _) = watch::channel(false);

        Self {
            id,
            peer: peer.ip().to_string(),
            connected: AtomicBool::new(true),
            closed,
            shutdown: None,
            reader: AsyncMutex::new(Some(reader)),
            writer: AsyncMutex::new(Some(writer)),
            player: Mutex::new(Player::default()),
            log,
        }
    }

    /// Ties the session to a server shutdown signal.
    ///
    /// Once the signal reads true, any blocked or later receive or send
    /// gives up and disconnects the session.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Registry id, assigned at accept time and never reused
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Peer IP address as text
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// False once `disconnect` has run, from any cause
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Reads the next frame from the client.
    ///
    /// Returns `None` once the session is disconnected: on peer close, IO
    /// error, oversized frame or a concurrent `disconnect`. Any of these
    /// leaves the session disconnected with its read half released.
    pub async fn receive_frame(&self) -> Option<Vec<u8>> {
        let mut closed = self.closed.subscribe();
        let mut shutdown = self.shutdown.clone();
        let mut reader = self.reader.lock().await;
        if !self.is_connected() {
            reader.take();
            return None;
        }

        let outcome = {
            let stream = reader.as_mut()?;
            tokio::select! {
                biased;
                _ = raised(Some(&mut closed)) => None,
                _ = raised(shutdown.as_mut()) => None,
                result = read_frame(stream) => Some(result),
            }
        };

        match outcome {
            Some(Ok(frame)) => return Some(frame),
            Some(Err(FrameError::Closed)) => {
                self.log.info(format_args!(
                    "Client {} disconnected gracefully",
                    self.peer
                ));
            }
            Some(Err(e @ FrameError::Oversized { .. })) => {
                self.log
                    .error(format_args!("Packet too large from {}: {}", self.peer, e));
            }
            Some(Err(e)) => {
                self.log.error(format_args!(
                    "Error receiving packet from {}: {}",
                    self.peer, e
                ));
            }
            None => {}
        }

        reader.take();
        self.disconnect();
        None
    }

    /// Sends one frame to the client.
    ///
    /// Returns false without touching the socket when the payload is empty or
    /// the session is already disconnected. A failed write disconnects the
    /// session and also returns false.
    pub async fn send_frame(&self, payload: &[u8]) -> bool {
        if payload.is_empty() || !self.is_connected() {
            return false;
        }

        let mut closed = self.closed.subscribe();
        let mut shutdown = self.shutdown.clone();
        let mut writer = self.writer.lock().await;
        if !self.is_connected() {
            writer.take();
            return false;
        }

        let outcome = {
            let Some(stream) = writer.as_mut() else {
                return false;
            };
            tokio::select! {
                biased;
                _ = raised(Some(&mut closed)) => None,
                _ = raised(shutdown.as_mut()) => None,
                result = write_frame(stream, payload) => Some(result),
            }
        };

        match outcome {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                self.log
                    .error(format_args!("Failed to send packet to {}: {}", self.peer, e));
                writer.take();
                self.disconnect();
                false
            }
            None => {
                writer.take();
                self.disconnect();
                false
            }
        }
    }

    /// Closes the connection. Idempotent and callable from any task.
    pub fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }

        self.closed.send_replace(true);

        // Halves that are busy in a receive or send are dropped by that
        // operation once it observes the closed signal.
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }

        self.log
            .debug(format_args!("Session {} ({}) closed", self.id, self.peer));
    }

    fn player(&self) -> std::sync::MutexGuard<'_, Player> {
        self.player.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current player identity
    pub fn player_snapshot(&self) -> Player {
        self.player().clone()
    }

    /// Guest name given at login, empty before that
    pub fn player_name(&self) -> String {
        self.player().name.clone()
    }

    pub fn set_player_name(&self, name: impl Into<String>) {
        self.player().name = name.into();
    }

    /// Numeric player id, `None` until login completes
    pub fn player_id(&self) -> Option<u32> {
        self.player().id
    }

    pub fn set_player_id(&self, id: u32) {
        self.player().id = Some(id);
    }

    /// Last spawn position recorded for the player
    pub fn position(&self) -> (i32, i32) {
        let player = self.player();
        (player.x, player.y)
    }

    pub fn set_position(&self, x: i32, y: i32) {
        let mut player = self.player();
        player.x = x;
        player.y = y;
    }
}

/// Completes once `signal` reads true. Never completes for a missing signal
/// or one whose sender is gone.
async fn raised(signal: Option<&mut watch::Receiver<bool>>) {
    if let Some(signal) = signal {
        if signal.wait_for(|raised| *raised).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("connected", &self.is_connected())
            .finish()
    }
}
