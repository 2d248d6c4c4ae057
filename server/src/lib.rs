//! # Game Server Library
//!
//! A minimal multiplayer game server: it accepts TCP connections, decodes the
//! framed packet protocol, tracks connected sessions and relays player
//! actions (chat, movement, world joins) between them.
//!
//! ## Architecture
//!
//! ### Task per Connection
//! One accept loop plus one independent task per connected session. A
//! session's blocking reads and writes only ever stall its own task, and
//! `Server::stop` can always force them to finish by disconnecting the
//! session.
//!
//! ### Single Registry Lock
//! All live sessions are held by one `SessionRegistry` behind a single
//! async mutex. Registration, removal and broadcast traversal are mutually
//! exclusive.
//!
//! ### Relay, not Simulation
//! The server does not validate or apply movement. Update packets are
//! re-encoded and relayed to every other session; chat is rebroadcast as a
//! console message carrying the sender's name.
//!
//! ### Fail-fast Sessions
//! Any transport or framing error disconnects the affected session and
//! nothing else. There is no retry; reconnecting is the recovery path.
//!
//! ## Module Organization
//!
//! - `session`: one connection's socket halves, send/receive discipline and
//!   player identity
//! - `registry`: live-session set and broadcast fan-out
//! - `dispatch`: per-session handling loop and protocol actions
//! - `network`: listener, accept loop and `Server` lifecycle
//! - `logging`: the injected `Logger` capability
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::logging::LogFacade;
//! use server::network::{Server, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(ServerConfig::default(), Arc::new(LogFacade::default()));
//!     server.initialize().await?;
//!
//!     // Accept clients until Ctrl+C, then disconnect everyone
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dispatch;
pub mod error;
pub mod logging;
pub mod network;
pub mod registry;
pub mod session;

pub use error::ServerError;
pub use network::{Server, ServerConfig};
