//! Smoke test: the server can bind a real UDP socket and run several ticks
//! with no connected clients without panicking.

use engine_server::GameServer;
use engine_shared::config::ServerConfig;
use engine_shared::net::UdpTransport;

#[tokio::test]
async fn server_runs_a_few_ticks_with_no_clients() -> anyhow::Result<()> {
    let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await?;
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tick_rate: 60,
        ..ServerConfig::default()
    };
    let mut server = GameServer::new(transport, config);

    for _ in 0..3 {
        server.tick_once().await?;
    }

    assert_eq!(server.client_count(), 0);
    Ok(())
}
