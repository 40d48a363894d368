//! Client-side prediction and server reconciliation.
//!
//! Prediction and reconciliation both call [`engine_shared::physics::step`]
//! so they can never diverge from the authoritative rule itself - only from
//! floating point evaluation order, which reconciliation corrects for every
//! time a snapshot arrives.

use engine_shared::input::InputRecord;
use engine_shared::physics;
use engine_shared::snapshot::EntityState;

/// A locally predicted input, kept until the server confirms it's been
/// applied (or superseded by reconciliation).
#[derive(Debug, Clone, Copy)]
pub struct PendingInput {
    pub input: InputRecord,
    pub predicted_state: EntityState,
}

/// Applies one tick of prediction to `state` in place.
pub fn predict(state: &mut EntityState, input: &InputRecord, dt: f32) {
    physics::step(state, input, dt);
}

/// Linear interpolation of position only, matching the original smoothing
/// function (velocity and health are not smoothed, only snapped).
pub fn smooth_correction(visual: &EntityState, target: &EntityState, smoothing: f32) -> EntityState {
    EntityState {
        entity_id: target.entity_id,
        x: visual.x + (target.x - visual.x) * smoothing,
        y: visual.y + (target.y - visual.y) * smoothing,
        vx: target.vx,
        vy: target.vy,
        health: target.health,
    }
}

/// Result of reconciling local prediction against an authoritative snapshot.
pub struct Reconciliation {
    pub corrected_state: EntityState,
    pub remaining: Vec<PendingInput>,
    pub prediction_error: Option<f64>,
}

/// Rebases from `server_entity`, discards inputs already reflected in
/// `last_acked_input_seq`, and replays the rest to rebuild the local state.
pub fn reconcile(
    server_entity: &EntityState,
    last_acked_input_seq: u32,
    pending_inputs: &[PendingInput],
    dt: f32,
) -> Reconciliation {
    let prediction_error = pending_inputs
        .iter()
        .find(|p| p.input.sequence == last_acked_input_seq)
        .map(|p| {
            let dx = (p.predicted_state.x - server_entity.x) as f64;
            let dy = (p.predicted_state.y - server_entity.y) as f64;
            (dx * dx + dy * dy).sqrt()
        });

    let remaining: Vec<PendingInput> = pending_inputs
        .iter()
        .filter(|p| p.input.sequence > last_acked_input_seq)
        .copied()
        .collect();

    let mut state = *server_entity;
    let mut replayed = Vec::with_capacity(remaining.len());
    for pending in &remaining {
        predict(&mut state, &pending.input, dt);
        replayed.push(PendingInput {
            input: pending.input,
            predicted_state: state,
        });
    }

    Reconciliation {
        corrected_state: state,
        remaining: replayed,
        prediction_error,
    }
}
