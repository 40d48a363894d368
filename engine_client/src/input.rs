//! Local input sampling and history.
//!
//! The actual keyboard/controller adapter is an external concern; this
//! module only shapes whatever comes in (or nothing, in `--headless` mode)
//! into the [`InputRecord`]s the wire protocol and predictor understand.

use std::collections::VecDeque;

use engine_shared::constants::INPUT_REDUNDANCY;
use engine_shared::input::{encode_redundant, InputRecord, PlayerActions};
use bytes::Bytes;

/// Current sampled movement intent, in `[-1, 1]` on each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub move_x: f32,
    pub move_y: f32,
    pub actions: PlayerActions,
}

impl InputState {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Rolling history of locally-generated input records, trimmed to
/// `2 * INPUT_REDUNDANCY` entries.
#[derive(Default)]
pub struct InputHistory {
    records: VecDeque<InputRecord>,
}

impl InputHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: InputRecord) {
        self.records.push_back(record);
        while self.records.len() > INPUT_REDUNDANCY * 2 {
            self.records.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&InputRecord> {
        self.records.back()
    }

    /// Builds the redundancy-prefixed wire payload for the trailing
    /// `INPUT_REDUNDANCY` records.
    pub fn redundant_payload(&self) -> Bytes {
        let start = self.records.len().saturating_sub(INPUT_REDUNDANCY);
        let trailing: Vec<InputRecord> = self.records.iter().skip(start).copied().collect();
        encode_redundant(&trailing)
    }
}
