//! Full client ↔ server integration tests over the in-memory mock transport.

use std::net::SocketAddr;

use engine_client::client::{headless_input, ClientState, GameClient};
use engine_client::input::InputState;
use engine_server::GameServer;
use engine_shared::codec::{Packet, PacketType};
use engine_shared::config::{ClientConfig, ServerConfig};
use engine_shared::input::PlayerActions;
use engine_shared::net::MockNetwork;

fn server_config() -> ServerConfig {
    ServerConfig {
        tick_rate: 60,
        ..ServerConfig::default()
    }
}

fn client_config(port: u16) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        tick_rate: 60,
        ..ClientConfig::default()
    }
}

/// Low-level sanity check: a bare CONNECT_REQ / CONNECT_ACK exchange over
/// the mock transport round-trips through the real codec.
#[tokio::test]
async fn raw_connect_handshake_roundtrips() {
    let net = MockNetwork::new();
    let server_addr: SocketAddr = "127.0.0.1:31101".parse().unwrap();
    let client_addr: SocketAddr = "127.0.0.1:31102".parse().unwrap();
    let server_transport = net.bind(server_addr);
    let client_transport = net.bind(client_addr);
    let mut server = GameServer::new(server_transport, server_config());

    let req = Packet::bare(PacketType::ConnectReq, bytes::Bytes::new());
    client_transport.send_to(&req.serialize(), server_addr).await.unwrap();
    server.tick_once().await.unwrap();

    let (bytes, _) = client_transport.recv_from().await.unwrap();
    let ack = Packet::deserialize(&bytes).unwrap();
    assert_eq!(ack.packet_type, PacketType::ConnectAck);
    assert_eq!(server.client_count(), 1);
}

/// Drives a real [`GameClient`] against a real [`GameServer`]: connects,
/// moves for a number of ticks, and checks the client's locally predicted
/// state tracks the server's authoritative snapshot for its own entity.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_connects_and_converges_with_server() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let net = MockNetwork::new();
    let server_addr: SocketAddr = "127.0.0.1:31111".parse().unwrap();
    let client_addr: SocketAddr = "127.0.0.1:31112".parse().unwrap();
    let server_transport = net.bind(server_addr);
    let client_transport = net.bind(client_addr);

    let mut server = GameServer::new(server_transport, server_config());
    let mut client = GameClient::new(client_transport, client_config(31111))?;

    let dt = 1.0 / 60.0;
    let moving_input = InputState {
        move_x: 1.0,
        move_y: 0.0,
        actions: PlayerActions::empty(),
    };

    // Connect: client sends CONNECT_REQ, server acks it.
    client.tick(dt, headless_input()).await?;
    server.tick_once().await?;
    client.tick(dt, headless_input()).await?;
    assert_eq!(client.state(), ClientState::Connected);

    // Run several ticks of movement, letting the server simulate and
    // broadcast, and the client predict/reconcile.
    for _ in 0..20 {
        client.tick(dt, moving_input).await?;
        server.tick_once().await?;
        client.tick(dt, headless_input()).await?;
    }

    let visual = client.visual_state().expect("client should have a visual state by now");
    assert!(visual.x > 100.0, "entity should have moved right from its spawn slot, got x={}", visual.x);

    Ok(())
}

/// Two clients connected to the same server each see the other as a remote,
/// interpolated entity.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_clients_see_each_other() -> anyhow::Result<()> {
    let net = MockNetwork::new();
    let server_addr: SocketAddr = "127.0.0.1:31121".parse().unwrap();
    let a_addr: SocketAddr = "127.0.0.1:31122".parse().unwrap();
    let b_addr: SocketAddr = "127.0.0.1:31123".parse().unwrap();

    let mut server = GameServer::new(net.bind(server_addr), server_config());
    let mut client_a = GameClient::new(net.bind(a_addr), client_config(31121))?;
    let mut client_b = GameClient::new(net.bind(b_addr), client_config(31121))?;

    let dt = 1.0 / 60.0;

    for _ in 0..5 {
        client_a.tick(dt, headless_input()).await?;
        client_b.tick(dt, headless_input()).await?;
        server.tick_once().await?;
        client_a.tick(dt, headless_input()).await?;
        client_b.tick(dt, headless_input()).await?;
    }

    assert_eq!(server.client_count(), 2);
    assert_eq!(client_a.state(), ClientState::Connected);
    assert_eq!(client_b.state(), ClientState::Connected);

    // Keep exchanging snapshots until both buffers have enough history to
    // interpolate a bracketing pair.
    for _ in 0..10 {
        server.tick_once().await?;
        client_a.tick(dt, headless_input()).await?;
        client_b.tick(dt, headless_input()).await?;
    }

    let a_sees = client_a.remote_entities();
    let b_sees = client_b.remote_entities();
    assert!(!a_sees.is_empty(), "client A should see client B as a remote entity");
    assert!(!b_sees.is_empty(), "client B should see client A as a remote entity");

    Ok(())
}
