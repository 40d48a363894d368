//! `engine_shared`
//!
//! Shared libraries used by both client and server.
//!
//! Design goals:
//! - Deterministic and modular where practical.
//! - Clear separation of concerns (codec, ack tracking, game state, transport).
//! - Traits for abstraction and dependency injection.
//! - No `unsafe`.

pub mod ack;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod game_state;
pub mod input;
pub mod metrics;
pub mod net;
pub mod physics;
pub mod snapshot;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::ack::AckTracker;
    pub use crate::codec::{Packet, PacketType};
    pub use crate::config::EngineConfig;
    pub use crate::constants::*;
    pub use crate::error::NetError;
    pub use crate::game_state::GameState;
    pub use crate::input::{InputRecord, PlayerActions};
    pub use crate::snapshot::{EntityState, Snapshot};
}
