//! Authoritative world state, owned by the server and replayed locally by
//! the client predictor.

use std::collections::HashMap;

use crate::constants::{WORLD_HEIGHT, WORLD_WIDTH};
use crate::input::InputRecord;
use crate::physics;
use crate::snapshot::{EntityState, Snapshot};

/// The full set of simulated entities at the current tick.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    pub tick: u32,
    entities: HashMap<u8, EntityState>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            entities: HashMap::new(),
        }
    }

    pub fn entities(&self) -> &HashMap<u8, EntityState> {
        &self.entities
    }

    pub fn get(&self, entity_id: u8) -> Option<&EntityState> {
        self.entities.get(&entity_id)
    }

    /// Adds `entity_id` at a deterministic spawn slot if it isn't already
    /// present; a no-op otherwise, so repeated connect retries don't respawn
    /// a client that's already in the world.
    pub fn add_entity(&mut self, entity_id: u8) {
        if self.entities.contains_key(&entity_id) {
            return;
        }
        let slot = self.entities.len() as f32;
        let x = 100.0 + (slot * 150.0) % (WORLD_WIDTH - 200.0);
        let y = WORLD_HEIGHT / 2.0;
        self.entities.insert(
            entity_id,
            EntityState {
                entity_id,
                x,
                y,
                vx: 0.0,
                vy: 0.0,
                health: 100.0,
            },
        );
    }

    pub fn remove_entity(&mut self, entity_id: u8) {
        self.entities.remove(&entity_id);
    }

    /// Applies one tick of movement for `entity_id`, if it exists.
    pub fn apply_input(&mut self, entity_id: u8, input: &InputRecord, dt: f32) {
        if let Some(entity) = self.entities.get_mut(&entity_id) {
            physics::step(entity, input, dt);
        }
    }

    /// A deep-copied snapshot of every entity at the current tick.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_entities(self.tick, &self.entities)
    }
}
