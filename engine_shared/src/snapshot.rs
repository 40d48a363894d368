//! World-state snapshots broadcast by the server each tick.
//!
//! Wire layout: a 5-byte header (`tick: u32`, `entity_count: u8`) followed by
//! `entity_count` fixed 21-byte entity records (`entity_id: u8`, then
//! `x, y, vx, vy, health` as big-endian `f32`). The server appends a 4-byte
//! `last_processed_input_seq` trailer after the snapshot bytes; that trailer
//! is not part of [`Snapshot`] itself, see [`crate::codec`] callers.

use std::collections::HashMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::NetError;

/// Size in bytes of one encoded entity record.
pub const ENTITY_STATE_SIZE: usize = 1 + 4 * 5;
/// Size in bytes of the snapshot header (tick + entity count).
pub const SNAPSHOT_HEADER_SIZE: usize = 4 + 1;

/// A single entity's physical state at a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityState {
    pub entity_id: u8,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub health: f32,
}

impl EntityState {
    pub fn serialize_into(&self, buf: &mut BytesMut) {
        buf.put_u8(self.entity_id);
        buf.put_f32(self.x);
        buf.put_f32(self.y);
        buf.put_f32(self.vx);
        buf.put_f32(self.vy);
        buf.put_f32(self.health);
    }

    pub fn deserialize(data: &mut impl Buf) -> Result<Self, NetError> {
        if data.remaining() < ENTITY_STATE_SIZE {
            return Err(NetError::MalformedSnapshot);
        }
        Ok(Self {
            entity_id: data.get_u8(),
            x: data.get_f32(),
            y: data.get_f32(),
            vx: data.get_f32(),
            vy: data.get_f32(),
            health: data.get_f32(),
        })
    }
}

/// A full world snapshot at a given authoritative tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tick: u32,
    pub entities: Vec<EntityState>,
}

impl Snapshot {
    pub fn new(tick: u32, entities: Vec<EntityState>) -> Self {
        Self { tick, entities }
    }

    /// Builds a snapshot from the server's authoritative entity map, in a
    /// deterministic order (ascending entity id) so encoded bytes are stable.
    pub fn from_entities(tick: u32, entities: &HashMap<u8, EntityState>) -> Self {
        let mut sorted: Vec<EntityState> = entities.values().copied().collect();
        sorted.sort_by_key(|e| e.entity_id);
        Self::new(tick, sorted)
    }

    /// Size in bytes this snapshot will occupy once serialized (excluding any
    /// trailer the caller appends).
    pub fn serialized_size(&self) -> usize {
        SNAPSHOT_HEADER_SIZE + self.entities.len() * ENTITY_STATE_SIZE
    }

    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.serialized_size());
        buf.put_u32(self.tick);
        buf.put_u8(self.entities.len() as u8);
        for entity in &self.entities {
            entity.serialize_into(&mut buf);
        }
        buf.freeze()
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, NetError> {
        let mut buf = data;
        if buf.remaining() < SNAPSHOT_HEADER_SIZE {
            return Err(NetError::MalformedSnapshot);
        }
        let tick = buf.get_u32();
        let count = buf.get_u8() as usize;

        let mut entities = Vec::with_capacity(count);
        for _ in 0..count {
            entities.push(EntityState::deserialize(&mut buf)?);
        }
        Ok(Self { tick, entities })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot::new(
            3,
            vec![
                EntityState {
                    entity_id: 1,
                    x: 10.0,
                    y: 20.0,
                    vx: 1.5,
                    vy: -1.5,
                    health: 100.0,
                },
                EntityState {
                    entity_id: 2,
                    x: -5.0,
                    y: 0.0,
                    vx: 0.0,
                    vy: 0.0,
                    health: 42.5,
                },
            ],
        )
    }

    #[test]
    fn roundtrip() {
        let snap = sample();
        let bytes = snap.serialize();
        assert_eq!(bytes.len(), snap.serialized_size());
        assert_eq!(Snapshot::deserialize(&bytes).unwrap(), snap);
    }

    #[test]
    fn empty_snapshot_roundtrips() {
        let snap = Snapshot::new(0, Vec::new());
        let bytes = snap.serialize();
        assert_eq!(bytes.len(), SNAPSHOT_HEADER_SIZE);
        assert_eq!(Snapshot::deserialize(&bytes).unwrap(), snap);
    }

    #[test]
    fn rejects_truncated_entity_record() {
        let snap = sample();
        let mut bytes = snap.serialize().to_vec();
        bytes.truncate(bytes.len() - 3);
        assert_eq!(
            Snapshot::deserialize(&bytes).unwrap_err(),
            NetError::MalformedSnapshot
        );
    }

    #[test]
    fn from_entities_is_ordered_by_id() {
        let mut map = HashMap::new();
        map.insert(
            5,
            EntityState {
                entity_id: 5,
                x: 0.0,
                y: 0.0,
                vx: 0.0,
                vy: 0.0,
                health: 1.0,
            },
        );
        map.insert(
            1,
            EntityState {
                entity_id: 1,
                x: 0.0,
                y: 0.0,
                vx: 0.0,
                vy: 0.0,
                health: 1.0,
            },
        );
        let snap = Snapshot::from_entities(9, &map);
        assert_eq!(snap.entities[0].entity_id, 1);
        assert_eq!(snap.entities[1].entity_id, 5);
    }
}
