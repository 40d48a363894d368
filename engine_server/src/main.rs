//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p engine_server -- [--host 0.0.0.0] [--port 9000] [--tick-rate 20] [--loss 0.05] [--latency 0.05]

use std::env;

use anyhow::Context;
use engine_server::GameServer;
use engine_shared::config::{NetworkConditions, ServerConfig};
use engine_shared::net::{SimulatedTransport, Transport, UdpTransport};
use tracing::info;

fn parse_args() -> ServerConfig {
    let mut cfg = ServerConfig::default();
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
    info!(host = %cfg.host, port = cfg.port, tick_rate = cfg.tick_rate, "starting server");

    let addr = cfg.bind_addr().parse().context("parse bind address")?;
    let udp = UdpTransport::bind(addr).await.context("bind udp socket")?;

    let transport: Box<dyn Transport> = if cfg.network != NetworkConditions::default() {
        info!(loss = cfg.network.loss, latency = cfg.network.latency, "simulating network conditions");
        Box::new(SimulatedTransport::new(udp, cfg.network))
    } else {
        Box::new(udp)
    };

    let mut server = GameServer::new(transport, cfg);
    info!(local = %server.local_addr()?, "server listening");
    server.run().await
}
