//! # Game Protocol
//!
//! Wire types shared by the server and the test client.
//!
//! ## Transport
//! Each TCP connection carries a sequence of frames: a 4-byte little-endian
//! length followed by one packet payload (`framing`).
//!
//! ## Packets
//! The first payload byte is the packet tag. Tag 2 is a string packet holding
//! protocol text or chat, tag 6 is a fixed-layout update packet describing an
//! object or player state change. Everything else decodes to
//! `Packet::Unknown` (`packet`).
//!
//! ## Protocol text
//! String packets that start with `action|<name>` select a server action.
//! The remaining lines are `key|value` pairs (`text`).

pub mod error;
pub mod framing;
pub mod packet;
pub mod text;

pub use error::{CodecError, FrameError};
pub use framing::{read_frame, write_frame, MAX_FRAME_LEN};
pub use packet::{
    console_message, encode_string, login_response, player_spawn, world_join_data, Packet,
    PacketType, UpdatePacket, DEFAULT_SPAWN, STRING_HEADER_LEN, UPDATE_HEADER_LEN,
};
