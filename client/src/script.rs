//! The scripted session: welcome, login, world join, one chat line, then a
//! short linger before disconnecting.

use crate::network::{Client, ClientError};
use log::info;
use protocol::{Packet, UpdatePacket};
use std::time::Duration;
use tokio::net::ToSocketAddrs;

/// Inputs of one scripted session
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    pub username: String,
    pub world: String,
    pub message: String,
    /// Time to stay connected after the chat line is sent
    pub linger: Duration,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            username: "TestUser".to_string(),
            world: "START".to_string(),
            message: "Hello from test client!".to_string(),
            linger: Duration::from_secs(2),
        }
    }
}

/// What the server sent back at each step
#[derive(Debug, Clone)]
pub struct ScriptReport {
    pub welcome: String,
    pub login: String,
    pub world: String,
    pub spawn: UpdatePacket,
}

/// Runs the full script against the server at `addr`
pub async fn run_script<A: ToSocketAddrs>(
    addr: A,
    config: &ScriptConfig,
) -> Result<ScriptReport, ClientError> {
    let mut client = Client::connect(addr).await?;

    let welcome = client.receive_text().await?;
    info!("Server says: {}", welcome);

    info!("Sending login request...");
    client
        .send_text(&format!(
            "action|login\nusername|{}\npassword|test123",
            config.username
        ))
        .await?;
    let login = client.receive_text().await?;
    info!("Login response: {}", login);

    info!("Sending world join request...");
    client
        .send_text(&format!("action|join_request\nname|{}", config.world))
        .await?;
    let world = client.receive_text().await?;
    info!("World response: {}", world);

    let spawn = match client.receive_packet().await? {
        Packet::Update(spawn) => spawn,
        got => {
            return Err(ClientError::Unexpected {
                expected: "spawn update",
                got,
            })
        }
    };
    info!(
        "Spawned as net id {} at ({}, {})",
        spawn.net_id, spawn.pos_x, spawn.pos_y
    );

    info!("Sending chat message...");
    client.send_text(&config.message).await?;

    tokio::time::sleep(config.linger).await;
    info!("Disconnecting...");

    Ok(ScriptReport {
        welcome,
        login,
        world,
        spawn,
    })
}
