//! Server startup errors.
//!
//! Only listener-level failures reach the caller. Transport and protocol
//! errors on an individual connection are logged and end that session.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from binding and starting the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {addr}: {source}")]
    Resolve { addr: String, source: io::Error },

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("server has not been initialized")]
    NotInitialized,
}
