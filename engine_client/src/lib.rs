//! `engine_client`
//!
//! Client-side systems:
//! - Connection management over a pluggable [`engine_shared::net::Transport`]
//! - Input capture and command generation
//! - Prediction and server reconciliation
//! - Interpolation for remote entity states

pub mod client;
pub mod input;
pub mod interp;
pub mod predict;

pub use client::{ClientState, GameClient};
