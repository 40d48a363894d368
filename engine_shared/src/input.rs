//! Client input records and their wire encodings.
//!
//! A single record is 13 bytes: `sequence: u32`, `move_x: f32`, `move_y: f32`,
//! `actions: u8`. To tolerate packet loss, clients normally send the last
//! [`crate::constants::INPUT_REDUNDANCY`] records in one `INPUT` packet,
//! prefixed with a 1-byte count; a payload of exactly [`INPUT_SIZE`] bytes is
//! the single-record form instead (see [`decode_payload`]).

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::NetError;

/// Size in bytes of one encoded [`InputRecord`].
pub const INPUT_SIZE: usize = 4 + 4 + 4 + 1;

bitflags! {
    /// Discrete action buttons, packed into the input record's trailing byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PlayerActions: u8 {
        const FIRE  = 0b0000_0001;
        const JUMP  = 0b0000_0010;
        const USE   = 0b0000_0100;
        const SPRINT = 0b0000_1000;
    }
}

/// One tick's worth of client movement intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputRecord {
    pub sequence: u32,
    pub move_x: f32,
    pub move_y: f32,
    pub actions: PlayerActions,
}

impl InputRecord {
    pub fn serialize_into(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sequence);
        buf.put_f32(self.move_x);
        buf.put_f32(self.move_y);
        buf.put_u8(self.actions.bits());
    }

    pub fn deserialize(data: &mut impl Buf) -> Result<Self, NetError> {
        if data.remaining() < INPUT_SIZE {
            return Err(NetError::MalformedPacket);
        }
        Ok(Self {
            sequence: data.get_u32(),
            move_x: data.get_f32(),
            move_y: data.get_f32(),
            actions: PlayerActions::from_bits_truncate(data.get_u8()),
        })
    }

    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(INPUT_SIZE);
        self.serialize_into(&mut buf);
        buf.freeze()
    }
}

/// Encodes a single input record with no redundancy wrapper.
pub fn encode_single(record: &InputRecord) -> Bytes {
    record.serialize()
}

/// Encodes the trailing `records` as a count-prefixed redundancy payload.
///
/// Callers pass the last [`crate::constants::INPUT_REDUNDANCY`] entries of
/// their local input history; an empty or single-element slice still uses
/// this form so the receiver's length check (`payload_len != INPUT_SIZE`)
/// reliably distinguishes it from the single-record form.
pub fn encode_redundant(records: &[InputRecord]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + records.len() * INPUT_SIZE);
    buf.put_u8(records.len() as u8);
    for record in records {
        record.serialize_into(&mut buf);
    }
    buf.freeze()
}

/// Decodes an `INPUT` packet payload, picking the single-record or
/// redundancy form based on payload length, matching the original
/// implementation's `len(payload) != INPUT_SIZE` test.
pub fn decode_payload(payload: &[u8]) -> Result<Vec<InputRecord>, NetError> {
    if payload.len() == INPUT_SIZE {
        let mut buf = payload;
        return Ok(vec![InputRecord::deserialize(&mut buf)?]);
    }
    if payload.is_empty() {
        return Err(NetError::MalformedPacket);
    }

    let mut buf = payload;
    let count = buf.get_u8() as usize;
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(InputRecord::deserialize(&mut buf)?);
    }
    Ok(records)
}
