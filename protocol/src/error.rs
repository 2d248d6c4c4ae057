//! Error types for packet encoding and frame transport.

use std::io;
use thiserror::Error;

/// Errors raised while encoding packets
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize update header: {0}")]
    Serialize(#[from] bincode::Error),

    #[error("update header encoded to {actual} bytes, expected {expected}")]
    HeaderLength { expected: usize, actual: usize },
}

/// Errors raised while reading or writing length-prefixed frames
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream before a length prefix arrived
    #[error("connection closed by peer")]
    Closed,

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    Oversized { len: usize, max: usize },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
