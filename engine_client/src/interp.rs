//! Snapshot buffering and remote-entity interpolation.
//!
//! The server sends discrete snapshots at tick boundaries; this renders
//! remote entities `INTERPOLATION_TICKS` ticks in the past so there's always
//! a bracketing pair of snapshots to lerp between.

use std::collections::VecDeque;

use engine_shared::constants::{INTERPOLATION_TICKS, SNAPSHOT_HISTORY};
use engine_shared::snapshot::{EntityState, Snapshot};

/// Buffered snapshot history, capped at [`SNAPSHOT_HISTORY`] entries.
#[derive(Default)]
pub struct SnapshotBuffer {
    history: VecDeque<Snapshot>,
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.history.push_back(snapshot);
        while self.history.len() > SNAPSHOT_HISTORY {
            self.history.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.history.back()
    }

    /// Estimated current server tick: the most recently received tick plus
    /// one, per the renderer's forward projection.
    pub fn current_tick_estimate(&self) -> Option<f64> {
        self.latest().map(|s| s.tick as f64 + 1.0)
    }

    /// Produces render states for every remote entity (i.e. not
    /// `local_entity_id`), `INTERPOLATION_TICKS` behind the estimated
    /// current server tick.
    pub fn interpolate(&self, local_entity_id: Option<u8>) -> Vec<EntityState> {
        let Some(estimate) = self.current_tick_estimate() else {
            return Vec::new();
        };
        let target = estimate - INTERPOLATION_TICKS;

        match self.bracketing_pair(target) {
            Some((s0, s1)) => {
                let tick_range = s1.tick as f64 - s0.tick as f64;
                let alpha = if tick_range <= 0.0 {
                    0.0
                } else {
                    ((target - s0.tick as f64) / tick_range).clamp(0.0, 1.0) as f32
                };

                s1.entities
                    .iter()
                    .filter(|e| Some(e.entity_id) != local_entity_id)
                    .map(|e1| match s0.entities.iter().find(|e0| e0.entity_id == e1.entity_id) {
                        Some(e0) => EntityState {
                            entity_id: e1.entity_id,
                            x: lerp(e0.x, e1.x, alpha),
                            y: lerp(e0.y, e1.y, alpha),
                            vx: e1.vx,
                            vy: e1.vy,
                            health: e1.health,
                        },
                        None => *e1,
                    })
                    .collect()
            }
            None => self
                .latest()
                .map(|s| {
                    s.entities
                        .iter()
                        .filter(|e| Some(e.entity_id) != local_entity_id)
                        .copied()
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    fn bracketing_pair(&self, target: f64) -> Option<(&Snapshot, &Snapshot)> {
        for pair in self.history.iter().collect::<Vec<_>>().windows(2) {
            let (s0, s1) = (pair[0], pair[1]);
            if (s0.tick as f64) <= target && target <= (s1.tick as f64) {
                return Some((s0, s1));
            }
        }
        None
    }
}

fn lerp(a: f32, b: f32, alpha: f32) -> f32 {
    a + (b - a) * alpha
}
