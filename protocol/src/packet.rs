//! Binary packet codec for the two implemented wire formats
//!
//! Every packet starts with a one byte tag. String packets carry a
//! little-endian length followed by UTF-8 text, update packets carry a fixed
//! 56 byte header followed by optional trailing bytes.

use crate::error::CodecError;
use serde::{Deserialize, Serialize};

/// Size of the fixed update packet header
pub const UPDATE_HEADER_LEN: usize = 56;

/// Size of the string packet header (tag, padding, length)
pub const STRING_HEADER_LEN: usize = 8;

/// Default spawn coordinate sent to every player joining a world
pub const DEFAULT_SPAWN: (i32, i32) = (100, 100);

/// Wire discriminant stored in the first byte of every packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Unknown = 0,
    String = 2,
    Integer = 3,
    Float = 4,
    Compound = 5,
    Update = 6,
}

impl PacketType {
    /// Maps a wire tag to its packet type.
    ///
    /// Tags outside the known set map to `PacketType::Unknown`.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            2 => PacketType::String,
            3 => PacketType::Integer,
            4 => PacketType::Float,
            5 => PacketType::Compound,
            6 => PacketType::Update,
            _ => PacketType::Unknown,
        }
    }

    /// Wire tag written as the first payload byte
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Object or player state change relayed between clients
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePacket {
    pub kind: u8,
    pub obj_type: u8,
    pub count1: u8,
    pub count2: u8,
    pub net_id: u32,
    pub item: u32,
    pub flags: u32,
    pub float_var: f32,
    pub int_data: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos2_x: f32,
    pub pos2_y: f32,
    pub particle_time: f32,
    pub state: u32,
    pub object_change_type: u32,
    pub particle_alt_id: u8,
    /// Variable length payload following the fixed header
    pub extra: Vec<u8>,
}

impl Default for UpdatePacket {
    fn default() -> Self {
        Self {
            kind: PacketType::Update.tag(),
            obj_type: 0,
            count1: 0,
            count2: 0,
            net_id: 0,
            item: 0,
            flags: 0,
            float_var: 0.0,
            int_data: 0,
            pos_x: 0.0,
            pos_y: 0.0,
            pos2_x: 0.0,
            pos2_y: 0.0,
            particle_time: 0.0,
            state: 0,
            object_change_type: 0,
            particle_alt_id: 0,
            extra: Vec::new(),
        }
    }
}

/// Fixed header as laid out on the wire.
///
/// bincode's default options write fields in declaration order with fixed-width
/// little-endian integers and no framing, so this struct serializes to exactly
/// `UPDATE_HEADER_LEN` bytes.
#[derive(Serialize, Deserialize)]
struct UpdateHeader {
    kind: u8,
    obj_type: u8,
    count1: u8,
    count2: u8,
    net_id: u32,
    item: u32,
    flags: u32,
    float_var: f32,
    int_data: u32,
    pos_x: f32,
    pos_y: f32,
    pos2_x: f32,
    pos2_y: f32,
    particle_time: f32,
    state: u32,
    object_change_type: u32,
    particle_alt_id: u8,
    padding: [u8; 3],
}

impl UpdatePacket {
    /// Encodes the fixed header followed by `extra` verbatim
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let header = UpdateHeader {
            kind: self.kind,
            obj_type: self.obj_type,
            count1: self.count1,
            count2: self.count2,
            net_id: self.net_id,
            item: self.item,
            flags: self.flags,
            float_var: self.float_var,
            int_data: self.int_data,
            pos_x: self.pos_x,
            pos_y: self.pos_y,
            pos2_x: self.pos2_x,
            pos2_y: self.pos2_y,
            particle_time: self.particle_time,
            state: self.state,
            object_change_type: self.object_change_type,
            particle_alt_id: self.particle_alt_id,
            padding: [0; 3],
        };

        let mut bytes = Vec::with_capacity(UPDATE_HEADER_LEN + self.extra.len());
        bincode::serialize_into(&mut bytes, &header)?;
        if bytes.len() != UPDATE_HEADER_LEN {
            return Err(CodecError::HeaderLength {
                expected: UPDATE_HEADER_LEN,
                actual: bytes.len(),
            });
        }
        bytes.extend_from_slice(&self.extra);
        Ok(bytes)
    }

    fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < UPDATE_HEADER_LEN {
            return None;
        }

        let header: UpdateHeader = bincode::deserialize(&data[..UPDATE_HEADER_LEN]).ok()?;
        Some(Self {
            kind: header.kind,
            obj_type: header.obj_type,
            count1: header.count1,
            count2: header.count2,
            net_id: header.net_id,
            item: header.item,
            flags: header.flags,
            float_var: header.float_var,
            int_data: header.int_data,
            pos_x: header.pos_x,
            pos_y: header.pos_y,
            pos2_x: header.pos2_x,
            pos2_y: header.pos2_y,
            particle_time: header.particle_time,
            state: header.state,
            object_change_type: header.object_change_type,
            particle_alt_id: header.particle_alt_id,
            extra: data[UPDATE_HEADER_LEN..].to_vec(),
        })
    }
}

/// A decoded packet payload
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// String packet: protocol text (`key|value` lines) or free chat text
    Text(String),
    Update(UpdatePacket),
    /// Unrecognized tag or truncated payload
    Unknown,
}

impl Packet {
    /// Decodes a frame payload, falling back to `Packet::Unknown` on any
    /// malformed or unsupported input.
    pub fn decode(data: &[u8]) -> Packet {
        if data.len() < 4 {
            return Packet::Unknown;
        }

        match PacketType::from_tag(data[0]) {
            PacketType::String => decode_string(data).map_or(Packet::Unknown, Packet::Text),
            PacketType::Update => UpdatePacket::decode(data).map_or(Packet::Unknown, Packet::Update),
            _ => Packet::Unknown,
        }
    }

    /// Wire type of this packet; `Text` reports `PacketType::String`
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Text(_) => PacketType::String,
            Packet::Update(_) => PacketType::Update,
            Packet::Unknown => PacketType::Unknown,
        }
    }
}

/// Encodes text as a string packet. No length limit is enforced here; the
/// frame layer rejects oversized payloads.
pub fn encode_string(text: &str) -> Vec<u8> {
    let body = text.as_bytes();
    let mut bytes = Vec::with_capacity(STRING_HEADER_LEN + body.len());
    bytes.push(PacketType::String.tag());
    bytes.extend_from_slice(&[0; 3]);
    bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
    bytes.extend_from_slice(body);
    bytes
}

fn decode_string(data: &[u8]) -> Option<String> {
    if data.len() < STRING_HEADER_LEN {
        return None;
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[4..STRING_HEADER_LEN]);
    let len = u32::from_le_bytes(len_bytes) as usize;

    let body = data.get(STRING_HEADER_LEN..STRING_HEADER_LEN.checked_add(len)?)?;
    Some(String::from_utf8_lossy(body).into_owned())
}

/// `action|log` console line shown to the player
pub fn console_message(text: &str) -> Vec<u8> {
    encode_string(&format!("action|log\nmsg|{}", text))
}

/// Console line answering a login request.
///
/// Carries `Login successful!` or `Login failed!`, followed by `message` on
/// its own line when it is non-empty.
pub fn login_response(success: bool, message: &str) -> Vec<u8> {
    let status = if success {
        "Login successful!"
    } else {
        "Login failed!"
    };

    if message.is_empty() {
        console_message(status)
    } else {
        console_message(&format!("{}\n{}", status, message))
    }
}

/// World description sent in reply to a join request.
///
/// Echoes the world name with invite-only and PvP-ignore both off. The
/// spawn update for the player follows it as a separate packet.
pub fn world_join_data(world_name: &str) -> Vec<u8> {
    encode_string(&format!(
        "action|join_request\nname|{}\ninviteonly|0\nignorePvP|0",
        world_name
    ))
}

/// Spawn update for a player; the name travels as NUL-terminated trailing bytes
pub fn player_spawn(net_id: u32, name: &str, x: i32, y: i32) -> Result<Vec<u8>, CodecError> {
    let mut extra = Vec::with_capacity(name.len() + 1);
    extra.extend_from_slice(name.as_bytes());
    extra.push(0);

    UpdatePacket {
        obj_type: 0,
        net_id,
        pos_x: x as f32,
        pos_y: y as f32,
        extra,
        ..UpdatePacket::default()
    }
    .encode()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_update() -> UpdatePacket {
        UpdatePacket {
            kind: PacketType::Update.tag(),
            obj_type: 7,
            count1: 1,
            count2: 2,
            net_id: 0xDEAD_BEEF,
            item: 42,
            flags: 0x8000_0001,
            float_var: -1.5,
            int_data: 99,
            pos_x: 320.25,
            pos_y: -64.0,
            pos2_x: f32::MAX,
            pos2_y: f32::MIN_POSITIVE,
            particle_time: 0.125,
            state: 3,
            object_change_type: 0xFFFF_FFFF,
            particle_alt_id: 255,
            extra: vec![1, 2, 3, 4, 5],
        }
    }

    #[test]
    fn test_packet_type_tags() {
        assert_eq!(PacketType::from_tag(2), PacketType::String);
        assert_eq!(PacketType::from_tag(6), PacketType::Update);
        assert_eq!(PacketType::from_tag(3), PacketType::Integer);
        assert_eq!(PacketType::from_tag(1), PacketType::Unknown);
        assert_eq!(PacketType::from_tag(200), PacketType::Unknown);
        assert_eq!(PacketType::Update.tag(), 6);
    }

    #[test]
    fn test_string_packet_layout() {
        let bytes = encode_string("hi");
        assert_eq!(bytes, vec![2, 0, 0, 0, 2, 0, 0, 0, b'h', b'i']);
    }

    #[test]
    fn test_string_roundtrip() {
        for text in ["", "a", "action|login\nname|x", "héllo wörld ✓", "line\n\nbreaks\n"] {
            let decoded = Packet::decode(&encode_string(text));
            assert_eq!(decoded, Packet::Text(text.to_string()));
        }
    }

    #[test]
    fn test_string_ignores_bytes_past_declared_length() {
        let mut bytes = encode_string("abc");
        bytes.extend_from_slice(b"trailing");
        assert_eq!(Packet::decode(&bytes), Packet::Text("abc".to_string()));
    }

    #[test]
    fn test_update_header_layout() {
        let packet = sample_update();
        let bytes = packet.encode().unwrap();

        assert_eq!(bytes.len(), UPDATE_HEADER_LEN + 5);
        assert_eq!(bytes[0], 6);
        assert_eq!(bytes[1], 7);
        assert_eq!(bytes[2], 1);
        assert_eq!(bytes[3], 2);
        assert_eq!(&bytes[4..8], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(&bytes[8..12], &42u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &(-1.5f32).to_le_bytes());
        assert_eq!(&bytes[24..28], &320.25f32.to_le_bytes());
        assert_eq!(&bytes[28..32], &(-64.0f32).to_le_bytes());
        assert_eq!(&bytes[48..52], &0xFFFF_FFFFu32.to_le_bytes());
        assert_eq!(bytes[52], 255);
        assert_eq!(&bytes[53..56], &[0, 0, 0]);
        assert_eq!(&bytes[56..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_update_roundtrip_is_bit_exact() {
        let packet = sample_update();
        let decoded = match Packet::decode(&packet.encode().unwrap()) {
            Packet::Update(update) => update,
            other => panic!("Expected update packet, got {:?}", other),
        };

        assert_eq!(decoded.net_id, packet.net_id);
        assert_eq!(decoded.pos2_x.to_bits(), packet.pos2_x.to_bits());
        assert_eq!(decoded.pos2_y.to_bits(), packet.pos2_y.to_bits());
        assert_eq!(decoded.float_var.to_bits(), packet.float_var.to_bits());
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_update_roundtrip_preserves_nan_bits() {
        let packet = UpdatePacket {
            particle_time: f32::from_bits(0x7FC0_1234),
            ..UpdatePacket::default()
        };
        match Packet::decode(&packet.encode().unwrap()) {
            Packet::Update(update) => {
                assert_eq!(update.particle_time.to_bits(), 0x7FC0_1234);
                assert!(update.extra.is_empty());
            }
            other => panic!("Expected update packet, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_short_input_is_unknown() {
        assert_eq!(Packet::decode(&[]), Packet::Unknown);
        assert_eq!(Packet::decode(&[2]), Packet::Unknown);
        assert_eq!(Packet::decode(&[2, 0, 0]), Packet::Unknown);
        assert_eq!(Packet::decode(&[6, 0, 0]), Packet::Unknown);
    }

    #[test]
    fn test_decode_truncated_string_is_unknown() {
        // Header cut short
        assert_eq!(Packet::decode(&[2, 0, 0, 0, 5, 0]), Packet::Unknown);

        // Declared length exceeds the buffer
        let mut bytes = encode_string("hello");
        bytes.truncate(bytes.len() - 1);
        assert_eq!(Packet::decode(&bytes), Packet::Unknown);

        // Declared length near u32::MAX must not overflow
        let bytes = [2, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, b'x'];
        assert_eq!(Packet::decode(&bytes), Packet::Unknown);
    }

    #[test]
    fn test_decode_truncated_update_is_unknown() {
        let bytes = sample_update().encode().unwrap();
        assert_eq!(Packet::decode(&bytes[..55]), Packet::Unknown);
        assert!(matches!(
            Packet::decode(&bytes[..UPDATE_HEADER_LEN]),
            Packet::Update(_)
        ));
    }

    #[test]
    fn test_decode_unimplemented_tags_are_unknown() {
        for tag in [0u8, 1, 3, 4, 5, 7, 255] {
            let mut bytes = vec![0u8; 64];
            bytes[0] = tag;
            assert_eq!(Packet::decode(&bytes), Packet::Unknown, "tag {}", tag);
        }
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        let bytes = [2, 0, 0, 0, 2, 0, 0, 0, 0xFF, b'a'];
        assert_eq!(Packet::decode(&bytes), Packet::Text("\u{FFFD}a".to_string()));
    }

    #[test]
    fn test_login_response_templates() {
        assert_eq!(
            Packet::decode(&login_response(true, "")),
            Packet::Text("action|log\nmsg|Login successful!".to_string())
        );
        assert_eq!(
            Packet::decode(&login_response(true, "Welcome to the server!")),
            Packet::Text("action|log\nmsg|Login successful!\nWelcome to the server!".to_string())
        );
        assert_eq!(
            Packet::decode(&login_response(false, "")),
            Packet::Text("action|log\nmsg|Login failed!".to_string())
        );
    }

    #[test]
    fn test_world_join_template() {
        assert_eq!(
            Packet::decode(&world_join_data("START")),
            Packet::Text("action|join_request\nname|START\ninviteonly|0\nignorePvP|0".to_string())
        );
    }

    #[test]
    fn test_player_spawn_packet() {
        let bytes = player_spawn(3, "Guest_12", 100, 100).unwrap();
        match Packet::decode(&bytes) {
            Packet::Update(update) => {
                assert_eq!(update.kind, 6);
                assert_eq!(update.obj_type, 0);
                assert_eq!(update.net_id, 3);
                assert_eq!(update.pos_x, 100.0);
                assert_eq!(update.pos_y, 100.0);
                assert_eq!(update.extra, b"Guest_12\0".to_vec());
            }
            other => panic!("Expected update packet, got {:?}", other),
        }
    }

    #[test]
    fn test_packet_type_of_decoded() {
        assert_eq!(Packet::Text(String::new()).packet_type(), PacketType::String);
        assert_eq!(Packet::Update(UpdatePacket::default()).packet_type(), PacketType::Update);
        assert_eq!(Packet::Unknown.packet_type(), PacketType::Unknown);
    }
}
