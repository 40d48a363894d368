//! Wire packet codec.
//!
//! Header layout (15 bytes, all fields big-endian):
//!
//! | field           | bytes | meaning                                      |
//! |-----------------|-------|-----------------------------------------------|
//! | protocol id     | 4     | magic `0x47414D45` ("GAME")                   |
//! | sequence        | 2     | outgoing sequence number, wraps at 2^16        |
//! | ack             | 2     | latest remote sequence we have observed       |
//! | ack bitfield    | 4     | bitfield acking the 32 sequences before `ack` |
//! | packet type     | 1     | one of [`PacketType`]                         |
//! | payload length  | 2     | length of the payload that follows            |
//!
//! Followed by `payload length` bytes of payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::NetError;

/// Magic number identifying this protocol ("GAME" in ASCII).
pub const PROTOCOL_ID: u32 = 0x4741_4D45;

/// Size of the fixed packet header, in bytes.
pub const HEADER_SIZE: usize = 15;

/// One-byte packet type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    ConnectReq = 0x01,
    ConnectAck = 0x02,
    Disconnect = 0x03,
    Input = 0x04,
    Snapshot = 0x05,
    Ping = 0x06,
    Pong = 0x07,
    ReliableEvent = 0x08,
    Heartbeat = 0x09,
}

impl PacketType {
    fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0x01 => PacketType::ConnectReq,
            0x02 => PacketType::ConnectAck,
            0x03 => PacketType::Disconnect,
            0x04 => PacketType::Input,
            0x05 => PacketType::Snapshot,
            0x06 => PacketType::Ping,
            0x07 => PacketType::Pong,
            0x08 => PacketType::ReliableEvent,
            0x09 => PacketType::Heartbeat,
            _ => return None,
        })
    }
}

/// A single wire packet: fixed header plus a raw payload.
///
/// The payload is left undecoded here - callers interpret it according to
/// `packet_type` (e.g. [`crate::input::InputRecord`] for `Input`,
/// [`crate::snapshot::Snapshot`] for `Snapshot`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub sequence: u16,
    pub ack: u16,
    pub ack_bitfield: u32,
    pub packet_type: PacketType,
    pub payload: Bytes,
}

impl Packet {
    /// Builds a packet, masking `sequence`/`ack`/`ack_bitfield` to their wire
    /// width so callers may pass pre-wrap arithmetic results directly.
    pub fn new(
        packet_type: PacketType,
        sequence: u32,
        ack: u32,
        ack_bitfield: u64,
        payload: Bytes,
    ) -> Self {
        Self {
            sequence: (sequence & 0xFFFF) as u16,
            ack: (ack & 0xFFFF) as u16,
            ack_bitfield: (ack_bitfield & 0xFFFF_FFFF) as u32,
            packet_type,
            payload,
        }
    }

    /// Builds a packet with no ack state, e.g. `CONNECT_REQ`/`DISCONNECT`.
    pub fn bare(packet_type: PacketType, payload: Bytes) -> Self {
        Self::new(packet_type, 0, 0, 0, payload)
    }

    /// Encodes this packet into a freshly-allocated buffer.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_u32(PROTOCOL_ID);
        buf.put_u16(self.sequence);
        buf.put_u16(self.ack);
        buf.put_u32(self.ack_bitfield);
        buf.put_u8(self.packet_type as u8);
        buf.put_u16(self.payload.len() as u16);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Decodes a packet from a datagram buffer.
    pub fn deserialize(mut data: &[u8]) -> Result<Self, NetError> {
        if data.len() < HEADER_SIZE {
            return Err(NetError::MalformedPacket);
        }

        let protocol_id = data.get_u32();
        if protocol_id != PROTOCOL_ID {
            return Err(NetError::BadProtocol);
        }

        let sequence = data.get_u16();
        let ack = data.get_u16();
        let ack_bitfield = data.get_u32();
        let packet_type =
            PacketType::from_u8(data.get_u8()).ok_or(NetError::MalformedPacket)?;
        let payload_len = data.get_u16() as usize;

        if data.remaining() < payload_len {
            return Err(NetError::TruncatedPayload);
        }

        let payload = Bytes::copy_from_slice(&data[..payload_len]);
        Ok(Self {
            sequence,
            ack,
            ack_bitfield,
            packet_type,
            payload,
        })
    }
}

/// Compares two 16-bit sequence numbers with wrap-around semantics.
///
/// `true` iff `s1` is "newer" than `s2`, treating the sequence space as a
/// circular buffer of 2^16 values (half the space is "ahead", half "behind").
pub fn sequence_greater_than(s1: u16, s2: u16) -> bool {
    let (s1, s2) = (s1 as i32, s2 as i32);
    ((s1 > s2) && (s1 - s2 <= 32768)) || ((s1 < s2) && (s2 - s1 > 32768))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_constants() {
        assert_eq!(HEADER_SIZE, 15);
        assert_eq!(PROTOCOL_ID, 0x4741_4D45);
    }

    #[test]
    fn sequence_wraps_on_construction() {
        let pkt = Packet::new(PacketType::Ping, 0x1_0000, 0, 0, Bytes::new());
        assert_eq!(pkt.sequence, 0);
    }

    #[test]
    fn roundtrip_empty_payload() {
        let pkt = Packet::bare(PacketType::ConnectReq, Bytes::new());
        let bytes = pkt.serialize();
        assert_eq!(Packet::deserialize(&bytes).unwrap(), pkt);
    }

    #[test]
    fn roundtrip_with_payload() {
        let pkt = Packet::new(
            PacketType::Snapshot,
            42,
            7,
            0xDEAD_BEEF,
            Bytes::from_static(b"hello"),
        );
        let bytes = pkt.serialize();
        assert_eq!(Packet::deserialize(&bytes).unwrap(), pkt);
    }

    #[test]
    fn rejects_short_buffer() {
        let err = Packet::deserialize(&[0u8; 10]).unwrap_err();
        assert_eq!(err, NetError::MalformedPacket);
    }

    #[test]
    fn rejects_bad_protocol_id() {
        let mut buf = BytesMut::new();
        buf.put_u32(0xDEAD_BEEF);
        buf.put_u16(0);
        buf.put_u16(0);
        buf.put_u32(0);
        buf.put_u8(PacketType::Ping as u8);
        buf.put_u16(0);
        let err = Packet::deserialize(&buf).unwrap_err();
        assert_eq!(err, NetError::BadProtocol);
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut buf = BytesMut::new();
        buf.put_u32(PROTOCOL_ID);
        buf.put_u16(0);
        buf.put_u16(0);
        buf.put_u32(0);
        buf.put_u8(PacketType::Input as u8);
        buf.put_u16(20); // claims 20 bytes of payload
        buf.extend_from_slice(&[0u8; 5]); // only 5 follow
        let err = Packet::deserialize(&buf).unwrap_err();
        assert_eq!(err, NetError::TruncatedPayload);
    }

    #[test]
    fn sequence_comparison_handles_wraparound() {
        assert!(sequence_greater_than(10, 5));
        assert!(!sequence_greater_than(5, 10));
        // near the wrap boundary, a small value is "ahead" of a large one
        assert!(sequence_greater_than(1, 65500));
        assert!(!sequence_greater_than(65500, 1));
    }
}
