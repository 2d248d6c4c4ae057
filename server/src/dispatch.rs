//! Per-session handling loop and packet dispatch
//!
//! Each accepted connection gets its own task running
//! `Dispatcher::handle_session`: send the welcome packet, then receive,
//! decode and dispatch frames until the session disconnects, and finally
//! remove the session from the registry.
//!
//! Dispatch rules:
//! - `action|login`: accept unconditionally, assign a guest name and id
//! - `action|join_request`: reply with world data and a spawn update
//! - `action|quit`: disconnect the session
//! - other `action|...`: logged, no reply
//! - any other text: chat, relayed to every other session
//! - update packets: relayed verbatim to every other session
//! - unknown packets: logged and ignored

use crate::logging::Logger;
use crate::registry::SessionRegistry;
use crate::session::Session;
use protocol::{
    console_message, login_response, player_spawn, text, world_join_data, CodecError, Packet,
    UpdatePacket, DEFAULT_SPAWN,
};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;

const LOGIN_GREETING: &str = "Welcome to the server!";

/// Interprets decoded packets for every session of one server
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Mutex<SessionRegistry>>,
    log: Arc<dyn Logger>,
    welcome: Arc<str>,
}

impl Dispatcher {
    /// Creates a dispatcher sharing `registry` with the accept loop.
    ///
    /// `welcome_message` is sent as a console line to every session before
    /// its first packet is read.
    pub fn new(
        registry: Arc<Mutex<SessionRegistry>>,
        log: Arc<dyn Logger>,
        welcome_message: &str,
    ) -> Self {
        Self {
            registry,
            log,
            welcome: Arc::from(welcome_message),
        }
    }

    /// Runs the handling loop for one session until it disconnects
    pub async fn handle_session(self, session: Arc<Session>) {
        self.log
            .info(format_args!("Handling client: {}", session.peer()));

        session.send_frame(&console_message(&self.welcome)).await;

        while session.is_connected() {
            let Some(frame) = session.receive_frame().await else {
                break;
            };

            let packet = Packet::decode(&frame);
            if let Err(e) = self.dispatch(&session, packet).await {
                self.log.error(format_args!(
                    "Failed to handle packet from {}: {}",
                    session.peer(),
                    e
                ));
            }
        }

        session.disconnect();
        self.log
            .info(format_args!("Client disconnected: {}", session.peer()));
        self.registry.lock().await.remove(session.id());
    }

    /// Applies one decoded packet on behalf of `session`
    pub async fn dispatch(&self, session: &Session, packet: Packet) -> Result<(), CodecError> {
        match packet {
            Packet::Text(body) => {
                self.log.info(format_args!(
                    "Received string packet from {}: {}",
                    session.peer(),
                    body
                ));
                self.handle_text(session, &body).await
            }
            Packet::Update(update) => {
                self.log.debug(format_args!(
                    "Received update packet from {}",
                    session.peer()
                ));
                self.handle_update(session, &update).await
            }
            Packet::Unknown => {
                self.log.debug(format_args!(
                    "Received unknown packet type from {}",
                    session.peer()
                ));
                Ok(())
            }
        }
    }

    async fn handle_text(&self, session: &Session, body: &str) -> Result<(), CodecError> {
        match text::action(body) {
            Some("login") => {
                self.handle_login(session).await;
                Ok(())
            }
            Some("join_request") => self.handle_join(session, body).await,
            Some("quit") => {
                self.log.info(format_args!(
                    "Client {} requested disconnect",
                    session.peer()
                ));
                session.disconnect();
                Ok(())
            }
            Some(action) => {
                self.log.debug(format_args!("Unknown action: {}", action));
                Ok(())
            }
            None => {
                self.handle_chat(session, body).await;
                Ok(())
            }
        }
    }

    async fn handle_login(&self, session: &Session) {
        self.log
            .info(format_args!("Login request from {}", session.peer()));

        let name = format!("Guest_{}", rand::thread_rng().gen_range(0..10000));
        let player_id = self.registry.lock().await.len() as u32;
        session.set_player_name(name.as_str());
        session.set_player_id(player_id);

        session
            .send_frame(&login_response(true, LOGIN_GREETING))
            .await;
        self.log.info(format_args!(
            "{} logged in as {} (id {})",
            session.peer(),
            name,
            player_id
        ));
    }

    async fn handle_join(&self, session: &Session, body: &str) -> Result<(), CodecError> {
        let Some(world) = text::field(body, "name") else {
            self.log.warning(format_args!(
                "World join request from {} without a world name",
                session.peer()
            ));
            return Ok(());
        };

        self.log.info(format_args!(
            "World join request from {} for world: {}",
            session.peer(),
            world
        ));

        let (x, y) = DEFAULT_SPAWN;
        // Unassigned ids go out as all ones
        let net_id = session.player_id().unwrap_or(u32::MAX);
        let spawn = player_spawn(net_id, &session.player_name(), x, y)?;

        session.send_frame(&world_join_data(world)).await;
        session.send_frame(&spawn).await;
        session.set_position(x, y);
        Ok(())
    }

    async fn handle_chat(&self, session: &Session, message: &str) {
        self.log.info(format_args!(
            "Chat message from {}: {}",
            session.peer(),
            message
        ));

        let chat = console_message(&format!("{}: {}", session.player_name(), message));
        self.registry
            .lock()
            .await
            .broadcast(&chat, Some(session.id()))
            .await;
    }

    async fn handle_update(&self, session: &Session, update: &UpdatePacket) -> Result<(), CodecError> {
        self.log.debug(format_args!(
            "Update packet from {} - Type: {} - NetID: {}",
            session.peer(),
            update.obj_type,
            update.net_id
        ));

        let relayed = update.encode()?;
        self.registry
            .lock()
            .await
            .broadcast(&relayed, Some(session.id()))
            .await;
        Ok(())
    }
}
