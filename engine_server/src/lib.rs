//! `engine_server`
//!
//! Authoritative server: fixed-tick drain-simulate-broadcast loop over a
//! pluggable [`engine_shared::net::Transport`].

pub mod server;
pub mod session;

pub use server::GameServer;
pub use session::{ClientRegistry, ClientSession};
