//! Runtime configuration for the server and client binaries.
//!
//! Values are populated by hand-rolled CLI parsing in each binary's
//! `main.rs` (no external argument-parsing crate); this module only holds
//! the resulting structs and their defaults.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_TICK_RATE};

/// Simulated network conditions, applied on top of a real transport for
/// local testing of loss/latency tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkConditions {
    /// Fraction of outgoing packets to drop, `0.0..=1.0`.
    pub loss: f32,
    /// Extra one-way delay applied to outgoing packets, in seconds.
    pub latency: f32,
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self {
            loss: 0.0,
            latency: 0.0,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tick_rate: u32,
    pub buffer_size: usize,
    pub network: NetworkConditions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            tick_rate: DEFAULT_TICK_RATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            network: NetworkConditions::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate as f64)
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub tick_rate: u32,
    pub headless: bool,
    pub network: NetworkConditions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            tick_rate: DEFAULT_TICK_RATE,
            headless: false,
            network: NetworkConditions::default(),
        }
    }
}

impl ClientConfig {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate as f64)
    }
}

/// Kept for API symmetry with the rest of the crate's components; the
/// server/client binaries each hold their own config struct directly.
pub type EngineConfig = ServerConfig;
