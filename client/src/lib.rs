//! # Test Client Library
//!
//! A small scripted client for exercising a running game server by hand or
//! from integration tests. It speaks the same framed protocol as the server
//! and walks through the usual session flow.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! `Client`, a framed TCP connection that sends string and update packets
//! and decodes whatever the server sends back.
//!
//! ### Script Module (`script`)
//! `run_script`, the fixed welcome → login → join → chat → disconnect
//! sequence, returning what the server replied at each step.

pub mod network;
pub mod script;

pub use network::{Client, ClientError};
pub use script::{run_script, ScriptConfig, ScriptReport};
