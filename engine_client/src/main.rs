//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p engine_client -- [--host 127.0.0.1] [--port 9000] [--tick-rate 20] [--headless] [--loss 0.05] [--latency 0.05]
//!
//! Connects to an authoritative server, samples local input every tick
//! (the zero vector in `--headless` mode), and runs prediction,
//! reconciliation, and remote-entity interpolation against the snapshots
//! it receives.

use std::env;

use anyhow::Context;
use engine_client::client::{headless_input, ClientState, GameClient};
use engine_shared::config::{ClientConfig, NetworkConditions};
use engine_shared::net::{SimulatedTransport, Transport, UdpTransport};
use tracing::info;

fn parse_args() -> ClientConfig {
    let mut cfg = ClientConfig::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" if i + 1 < args.len() => {
                cfg.host = args[i + 1].clone();
                i += 2;
            }
            "--port" if i + 1 < args.len() => {
                cfg.port = args[i + 1].parse().unwrap_or(cfg.port);
                i += 2;
            }
            "--tick-rate" if i + 1 < args.len() => {
                cfg.tick_rate = args[i + 1].parse().unwrap_or(cfg.tick_rate);
                i += 2;
            }
            "--headless" => {
                cfg.headless = true;
                i += 1;
            }
            "--loss" if i + 1 < args.len() => {
                cfg.network.loss = args[i + 1].parse().unwrap_or(0.0);
                i += 2;
            }
            "--latency" if i + 1 < args.len() => {
                cfg.network.latency = args[i + 1].parse().unwrap_or(0.0);
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args();
    info!(server = %cfg.server_addr(), headless = cfg.headless, "starting client");

    let udp = UdpTransport::bind("0.0.0.0:0".parse().unwrap())
        .await
        .context("bind udp socket")?;

    let transport: Box<dyn Transport> = if cfg.network != NetworkConditions::default() {
        info!(loss = cfg.network.loss, latency = cfg.network.latency, "simulating network conditions");
        Box::new(SimulatedTransport::new(udp, cfg.network))
    } else {
        Box::new(udp)
    };

    let tick_duration = cfg.tick_duration();
    let dt = tick_duration.as_secs_f32();
    let mut client = GameClient::new(transport, cfg)?;

    // No real input device is wired up yet; every run samples the zero
    // vector, same as `--headless` would.
    let mut next_tick = tokio::time::Instant::now();
    loop {
        client.tick(dt, headless_input()).await?;

        if client.state() == ClientState::Connected {
            if let Some(tick) = client.last_server_tick() {
                if tick % 64 == 0 {
                    info!(tick, entities = client.remote_entities().len(), "snapshot");
                }
            }
        }

        next_tick += tick_duration;
        tokio::time::sleep_until(next_tick).await;
    }
}
