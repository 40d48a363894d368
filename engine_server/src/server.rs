//! Authoritative server: fixed-tick drain-simulate-broadcast loop.
//!
//! Determinism notes:
//! - Keep simulation in a fixed timestep.
//! - Avoid wall-clock-dependent branching in gameplay code.
//! - Use stable ordering when iterating collections.

use std::net::SocketAddr;
use std::time::Instant as StdInstant;

use bytes::{Bytes, BytesMut, BufMut};
use engine_shared::codec::{Packet, PacketType};
use engine_shared::config::ServerConfig;
use engine_shared::constants::MAX_DRAIN_PER_TICK;
use engine_shared::error::NetError;
use engine_shared::game_state::GameState;
use engine_shared::input;
use engine_shared::metrics::Metrics;
use engine_shared::net::Transport;
use tokio::time::Instant as TokioInstant;
use tracing::{debug, info, warn};

use crate::session::ClientRegistry;

/// Server bound to a concrete [`Transport`], which may be a real UDP socket
/// or an in-memory mock in tests.
pub struct GameServer<T: Transport> {
    transport: T,
    config: ServerConfig,
    registry: ClientRegistry,
    game_state: GameState,
    metrics: Metrics,
    tick: u32,
    last_metrics_log: StdInstant,
}

impl<T: Transport> GameServer<T> {
    pub fn new(transport: T, config: ServerConfig) -> Self {
        Self {
            transport,
            config,
            registry: ClientRegistry::new(),
            game_state: GameState::new(),
            metrics: Metrics::new(),
            tick: 0,
            last_metrics_log: StdInstant::now(),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.transport.local_addr()
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    pub fn current_tick(&self) -> u32 {
        self.tick
    }

    /// Runs the fixed-tick loop until the transport closes.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut next_tick_time = TokioInstant::now();
        loop {
            self.drain().await?;

            while TokioInstant::now() >= next_tick_time {
                self.advance_one_tick().await;
                next_tick_time += self.config.tick_duration();
            }

            self.maybe_log_metrics();
            tokio::time::sleep_until(next_tick_time).await;
        }
    }

    /// Drains the socket until it's empty or the safety bound is hit.
    async fn drain(&mut self) -> anyhow::Result<()> {
        for _ in 0..MAX_DRAIN_PER_TICK {
            match self.transport.try_recv_from() {
                Ok((bytes, addr)) => self.handle_datagram(&bytes, addr).await,
                Err(NetError::TransportWouldBlock) => break,
                Err(NetError::TransportClosed) => {
                    anyhow::bail!("transport closed, shutting down server loop")
                }
                Err(_) => break,
            }
        }
        Ok(())
    }

    async fn handle_datagram(&mut self, bytes: &[u8], addr: SocketAddr) {
        let packet = match Packet::deserialize(bytes) {
            Ok(p) => p,
            Err(e) => {
                debug!(?e, %addr, "dropping malformed packet");
                return;
            }
        };

        if let Some(session) = self.registry.get_by_address_mut(&addr) {
            session.bytes_received += bytes.len() as u64;
        }

        match packet.packet_type {
            PacketType::ConnectReq => self.handle_connect(addr).await,
            PacketType::Input => self.handle_input(addr, &packet),
            PacketType::Ping => self.handle_ping(addr, &packet).await,
            PacketType::Disconnect => self.handle_disconnect(addr),
            PacketType::Heartbeat => {}
            other => debug!(?other, %addr, "unexpected packet type at server"),
        }

        if let Some(session) = self.registry.get_by_address_mut(&addr) {
            session.last_heard = StdInstant::now();
            session.ack_tracker.on_packet_received(packet.sequence);
        }
    }

    async fn handle_connect(&mut self, addr: SocketAddr) {
        let client_id = if let Some(session) = self.registry.get_by_address(&addr) {
            session.client_id
        } else {
            match self.registry.add(addr) {
                Some(id) => {
                    self.game_state.add_entity(id);
                    info!(%addr, client_id = id, "client connected");
                    id
                }
                None => {
                    warn!(%addr, error = %NetError::CapacityExhausted, "dropping CONNECT_REQ");
                    return;
                }
            }
        };
        self.send_to_client(addr, PacketType::ConnectAck, Bytes::copy_from_slice(&[client_id]), None)
            .await;
    }

    fn handle_input(&mut self, addr: SocketAddr, packet: &Packet) {
        let Some(session) = self.registry.get_by_address_mut(&addr) else {
            debug!(%addr, "INPUT from unknown session, dropping");
            return;
        };
        match input::decode_payload(&packet.payload) {
            Ok(records) => {
                for record in records {
                    session.enqueue_input(record);
                }
            }
            Err(e) => debug!(?e, %addr, "dropping malformed INPUT payload"),
        }
    }

    async fn handle_ping(&mut self, addr: SocketAddr, packet: &Packet) {
        if !self.registry.has_address(&addr) {
            return;
        }
        self.send_to_client(addr, PacketType::Pong, packet.payload.clone(), Some(packet.sequence))
            .await;
    }

    fn handle_disconnect(&mut self, addr: SocketAddr) {
        let Some(session) = self.registry.get_by_address(&addr) else {
            return;
        };
        let client_id = session.client_id;
        self.registry.remove(client_id);
        self.game_state.remove_entity(client_id);
        info!(%addr, client_id, "client disconnected");
    }

    /// Allocates a sequence/ack pair for `addr`, serializes a packet of the
    /// given type, and sends it. `ack_override` replaces the tracked `ack`
    /// field (used by `PONG`, which echoes the ping's own sequence).
    async fn send_to_client(
        &mut self,
        addr: SocketAddr,
        packet_type: PacketType,
        payload: Bytes,
        ack_override: Option<u16>,
    ) {
        let Some((sequence, mut ack, ack_bitfield)) = self.next_send_state(addr) else {
            return;
        };
        if let Some(o) = ack_override {
            ack = o;
        }
        let packet = Packet::new(packet_type, sequence as u32, ack as u32, ack_bitfield as u64, payload);
        let bytes = packet.serialize();
        let len = bytes.len() as u64;
        let sent = self.transport.send_to(&bytes, addr).await.is_ok();
        if let Some(session) = self.registry.get_by_address_mut(&addr) {
            if sent {
                session.bytes_sent += len;
            } else {
                warn!(%addr, ?packet_type, "send failed");
            }
        }
    }

    fn next_send_state(&mut self, addr: SocketAddr) -> Option<(u16, u16, u32)> {
        let session = self.registry.get_by_address_mut(&addr)?;
        let sequence = session.ack_tracker.next_sequence();
        let (ack, ack_bitfield) = session.ack_tracker.local_ack_state();
        session.ack_tracker.on_packet_sent(sequence);
        Some((sequence, ack, ack_bitfield))
    }

    /// Publishes the tick, applies queued inputs, evicts timed-out sessions,
    /// broadcasts a snapshot, then advances the tick counter.
    async fn advance_one_tick(&mut self) {
        let tick_start = StdInstant::now();
        self.game_state.tick = self.tick;

        let ids: Vec<u8> = self.registry.all().map(|s| s.client_id).collect();
        let dt = self.config.tick_duration().as_secs_f32();
        for id in ids {
            let pending = match self.registry.get_mut(id) {
                Some(session) => std::mem::take(&mut session.pending_inputs),
                None => continue,
            };
            let mut max_seq: Option<u32> = None;
            for record in &pending {
                self.game_state.apply_input(id, record, dt);
                max_seq = Some(max_seq.map_or(record.sequence, |m| m.max(record.sequence)));
            }
            if let (Some(session), Some(seq)) = (self.registry.get_mut(id), max_seq) {
                if seq > session.last_processed_input_seq {
                    session.last_processed_input_seq = seq;
                }
            }
        }

        for id in self.registry.check_timeouts() {
            if self.registry.remove(id).is_some() {
                self.game_state.remove_entity(id);
                info!(client_id = id, "client timed out");
            }
        }

        self.broadcast_snapshot().await;
        self.tick += 1;

        self.metrics
            .record_tick_time(tick_start.elapsed().as_secs_f64() * 1000.0);
    }

    async fn broadcast_snapshot(&mut self) {
        let snapshot = self.game_state.snapshot();
        let snap_bytes = snapshot.serialize();
        let mut total_sent = 0u64;

        let ids: Vec<u8> = self.registry.all().map(|s| s.client_id).collect();
        for id in ids {
            let send_state = {
                let Some(session) = self.registry.get_mut(id) else {
                    continue;
                };
                let sequence = session.ack_tracker.next_sequence();
                let (ack, ack_bitfield) = session.ack_tracker.local_ack_state();
                session.ack_tracker.on_packet_sent(sequence);
                (sequence, ack, ack_bitfield, session.address, session.last_processed_input_seq)
            };
            let (sequence, ack, ack_bitfield, addr, trailer) = send_state;

            let mut payload = BytesMut::with_capacity(snap_bytes.len() + 4);
            payload.extend_from_slice(&snap_bytes);
            payload.put_u32(trailer);

            let packet = Packet::new(
                PacketType::Snapshot,
                sequence as u32,
                ack as u32,
                ack_bitfield as u64,
                payload.freeze(),
            );
            let bytes = packet.serialize();
            let len = bytes.len() as u64;
            if self.transport.send_to(&bytes, addr).await.is_ok() {
                total_sent += len;
                if let Some(session) = self.registry.get_mut(id) {
                    session.bytes_sent += len;
                }
            }
        }

        self.metrics.record_bandwidth_bytes(total_sent);
    }

    fn maybe_log_metrics(&mut self) {
        if self.last_metrics_log.elapsed().as_secs_f64() < 5.0 {
            return;
        }
        self.last_metrics_log = StdInstant::now();
        let avg_loss = if self.registry.is_empty() {
            0.0
        } else {
            self.registry
                .all()
                .map(|s| s.ack_tracker.loss_rate())
                .sum::<f64>()
                / self.registry.len() as f64
        };
        self.metrics.set_packet_loss(avg_loss);
        self.metrics.log_summary("server");
        info!(
            tick = self.tick,
            clients = self.registry.len(),
            "server stats"
        );
    }

    /// Runs exactly one drain+advance cycle, for tests that don't want the
    /// infinite [`Self::run`] loop.
    pub async fn tick_once(&mut self) -> anyhow::Result<()> {
        self.drain().await?;
        self.advance_one_tick().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_shared::codec::Packet;
    use engine_shared::input::{encode_single, InputRecord, PlayerActions};
    use engine_shared::net::MockNetwork;
    use engine_shared::snapshot::Snapshot;

    fn server_config() -> ServerConfig {
        ServerConfig {
            tick_rate: 20,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn connect_req_creates_session_and_acks() {
        let net = MockNetwork::new();
        let server_addr: SocketAddr = "127.0.0.1:30001".parse().unwrap();
        let client_addr: SocketAddr = "127.0.0.1:30002".parse().unwrap();
        let server_transport = net.bind(server_addr);
        let client_transport = net.bind(client_addr);

        let mut server = GameServer::new(server_transport, server_config());

        let req = Packet::bare(PacketType::ConnectReq, Bytes::new());
        client_transport.send_to(&req.serialize(), server_addr).await.unwrap();

        server.tick_once().await.unwrap();
        assert_eq!(server.client_count(), 1);

        let (bytes, _) = client_transport.recv_from().await.unwrap();
        let ack = Packet::deserialize(&bytes).unwrap();
        assert_eq!(ack.packet_type, PacketType::ConnectAck);
        assert_eq!(ack.payload[0], 1);
    }

    #[tokio::test]
    async fn repeated_connect_req_is_idempotent() {
        let net = MockNetwork::new();
        let server_addr: SocketAddr = "127.0.0.1:30011".parse().unwrap();
        let client_addr: SocketAddr = "127.0.0.1:30012".parse().unwrap();
        let server_transport = net.bind(server_addr);
        let client_transport = net.bind(client_addr);
        let mut server = GameServer::new(server_transport, server_config());

        let req = Packet::bare(PacketType::ConnectReq, Bytes::new());
        for _ in 0..3 {
            client_transport.send_to(&req.serialize(), server_addr).await.unwrap();
            server.tick_once().await.unwrap();
            let _ = client_transport.recv_from().await.unwrap();
        }
        assert_eq!(server.client_count(), 1);
    }

    #[tokio::test]
    async fn input_moves_entity_and_snapshot_reflects_it() {
        let net = MockNetwork::new();
        let server_addr: SocketAddr = "127.0.0.1:30021".parse().unwrap();
        let client_addr: SocketAddr = "127.0.0.1:30022".parse().unwrap();
        let server_transport = net.bind(server_addr);
        let client_transport = net.bind(client_addr);
        let mut server = GameServer::new(server_transport, server_config());

        let req = Packet::bare(PacketType::ConnectReq, Bytes::new());
        client_transport.send_to(&req.serialize(), server_addr).await.unwrap();
        server.tick_once().await.unwrap();
        let _ = client_transport.recv_from().await.unwrap(); // CONNECT_ACK

        let input = InputRecord {
            sequence: 1,
            move_x: 1.0,
            move_y: 0.0,
            actions: PlayerActions::empty(),
        };
        let input_packet = Packet::bare(PacketType::Input, encode_single(&input));
        client_transport
            .send_to(&input_packet.serialize(), server_addr)
            .await
            .unwrap();

        server.tick_once().await.unwrap();
        let (bytes, _) = client_transport.recv_from().await.unwrap();
        let snap_packet = Packet::deserialize(&bytes).unwrap();
        assert_eq!(snap_packet.packet_type, PacketType::Snapshot);

        let snapshot = Snapshot::deserialize(&snap_packet.payload).unwrap();
        assert_eq!(snapshot.entities.len(), 1);
        assert!(snapshot.entities[0].vx > 0.0);
    }

    #[tokio::test]
    async fn disconnect_removes_session() {
        let net = MockNetwork::new();
        let server_addr: SocketAddr = "127.0.0.1:30031".parse().unwrap();
        let client_addr: SocketAddr = "127.0.0.1:30032".parse().unwrap();
        let server_transport = net.bind(server_addr);
        let client_transport = net.bind(client_addr);
        let mut server = GameServer::new(server_transport, server_config());

        let req = Packet::bare(PacketType::ConnectReq, Bytes::new());
        client_transport.send_to(&req.serialize(), server_addr).await.unwrap();
        server.tick_once().await.unwrap();
        let _ = client_transport.recv_from().await.unwrap();

        let disconnect = Packet::bare(PacketType::Disconnect, Bytes::new());
        client_transport
            .send_to(&disconnect.serialize(), server_addr)
            .await
            .unwrap();
        server.tick_once().await.unwrap();

        assert_eq!(server.client_count(), 0);
    }

    #[tokio::test]
    async fn ping_echoes_payload_with_ack_set_to_ping_sequence() {
        let net = MockNetwork::new();
        let server_addr: SocketAddr = "127.0.0.1:30041".parse().unwrap();
        let client_addr: SocketAddr = "127.0.0.1:30042".parse().unwrap();
        let server_transport = net.bind(server_addr);
        let client_transport = net.bind(client_addr);
        let mut server = GameServer::new(server_transport, server_config());

        let req = Packet::bare(PacketType::ConnectReq, Bytes::new());
        client_transport.send_to(&req.serialize(), server_addr).await.unwrap();
        server.tick_once().await.unwrap();
        let _ = client_transport.recv_from().await.unwrap();

        let ping = Packet::new(PacketType::Ping, 7, 0, 0, Bytes::from_static(&42.0f64.to_be_bytes()));
        client_transport.send_to(&ping.serialize(), server_addr).await.unwrap();
        server.tick_once().await.unwrap();

        let (bytes, _) = client_transport.recv_from().await.unwrap();
        let pong = Packet::deserialize(&bytes).unwrap();
        assert_eq!(pong.packet_type, PacketType::Pong);
        assert_eq!(pong.ack, 7);
        assert_eq!(&pong.payload[..], &42.0f64.to_be_bytes());
    }
}
