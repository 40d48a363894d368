//! Engine-wide tunables.
//!
//! Kept as plain `const`s rather than a config struct: these are protocol and
//! simulation constants, not per-deployment settings (those live in
//! [`crate::config::EngineConfig`]).

/// World rectangle width, in world units.
pub const WORLD_WIDTH: f32 = 800.0;
/// World rectangle height, in world units.
pub const WORLD_HEIGHT: f32 = 600.0;

/// Player movement speed, in units per second.
pub const PLAYER_SPEED: f32 = 200.0;

/// Default server tick rate, in Hz.
pub const DEFAULT_TICK_RATE: u32 = 20;
/// Default datagram receive buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Seconds of silence from a client before the server evicts its session.
pub const CLIENT_TIMEOUT: f64 = 10.0;
/// Seconds between unacknowledged `CONNECT_REQ` retries.
pub const CONNECT_RETRY_INTERVAL: f64 = 1.0;
/// Seconds between `PING` packets.
pub const PING_INTERVAL: f64 = 1.0;

/// Number of ticks remote entities are rendered behind the estimated server tick.
pub const INTERPOLATION_TICKS: f64 = 2.0;
/// Number of trailing input records carried in each redundancy-form `INPUT` packet.
pub const INPUT_REDUNDANCY: usize = 3;

/// Safety bound on datagrams drained from the socket in a single pass.
pub const MAX_DRAIN_PER_TICK: usize = 1000;

/// Bound on buffered server snapshots kept client-side for interpolation/reconciliation.
pub const SNAPSHOT_HISTORY: usize = 60;
