//! Movement integration shared by the authoritative server and the client
//! predictor.
//!
//! This is deliberately the *only* place the movement rule is written down -
//! [`crate::game_state::GameState::apply_input`] and the client predictor
//! both call [`step`], so prediction can only diverge from the server by
//! floating point order-of-operations, never by a second copy of the rule.

use crate::constants::{PLAYER_SPEED, WORLD_HEIGHT, WORLD_WIDTH};
use crate::input::InputRecord;
use crate::snapshot::EntityState;

/// Integrates one tick of movement for `entity` given `input` and `dt`.
///
/// Movement intent is normalized when its magnitude exceeds 1.0 so a
/// diagonal input can't move faster than an axis-aligned one. Position is
/// clamped to the world rectangle.
pub fn step(entity: &mut EntityState, input: &InputRecord, dt: f32) {
    let (mut move_x, mut move_y) = (input.move_x, input.move_y);
    let magnitude = (move_x * move_x + move_y * move_y).sqrt();
    if magnitude > 1.0 {
        move_x /= magnitude;
        move_y /= magnitude;
    }

    entity.vx = move_x * PLAYER_SPEED;
    entity.vy = move_y * PLAYER_SPEED;

    entity.x += entity.vx * dt;
    entity.y += entity.vy * dt;

    entity.x = entity.x.clamp(0.0, WORLD_WIDTH);
    entity.y = entity.y.clamp(0.0, WORLD_HEIGHT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PlayerActions;

    fn entity() -> EntityState {
        EntityState {
            entity_id: 1,
            x: 400.0,
            y: 300.0,
            vx: 0.0,
            vy: 0.0,
            health: 100.0,
        }
    }

    fn input(move_x: f32, move_y: f32) -> InputRecord {
        InputRecord {
            sequence: 1,
            move_x,
            move_y,
            actions: PlayerActions::empty(),
        }
    }

    #[test]
    fn moves_along_axis() {
        let mut e = entity();
        step(&mut e, &input(1.0, 0.0), 1.0);
        assert_eq!(e.vx, PLAYER_SPEED);
        assert_eq!(e.x, 400.0 + PLAYER_SPEED);
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let mut e = entity();
        step(&mut e, &input(1.0, 1.0), 1.0);
        let speed = (e.vx * e.vx + e.vy * e.vy).sqrt();
        assert!((speed - PLAYER_SPEED).abs() < 1e-3);
    }

    #[test]
    fn position_clamps_to_world_bounds() {
        let mut e = entity();
        e.x = WORLD_WIDTH - 1.0;
        step(&mut e, &input(1.0, 0.0), 1.0);
        assert_eq!(e.x, WORLD_WIDTH);

        e.x = 1.0;
        step(&mut e, &input(-1.0, 0.0), 1.0);
        assert_eq!(e.x, 0.0);
    }
}
