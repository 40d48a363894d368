//! Client-side connection, prediction, reconciliation, and interpolation.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes};
use engine_shared::ack::AckTracker;
use engine_shared::codec::{Packet, PacketType};
use engine_shared::config::ClientConfig;
use engine_shared::constants::{CONNECT_RETRY_INTERVAL, PING_INTERVAL};
use engine_shared::error::NetError;
use engine_shared::input::{InputRecord, PlayerActions};
use engine_shared::metrics::Metrics;
use engine_shared::net::Transport;
use engine_shared::snapshot::{EntityState, Snapshot};
use tracing::{debug, info, warn};

use crate::input::{InputHistory, InputState};
use crate::interp::SnapshotBuffer;
use crate::predict::{self, PendingInput};

const MAX_PENDING_INPUTS: usize = 60;

/// The client's connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connected,
}

/// A networked client running prediction, reconciliation, and interpolation
/// against an authoritative server.
pub struct GameClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    server_addr: SocketAddr,

    ack_tracker: AckTracker,
    client_id: Option<u8>,
    state: ClientState,

    local_state: Option<EntityState>,
    visual_state: Option<EntityState>,
    pending_inputs: Vec<PendingInput>,
    input_history: InputHistory,
    local_input_seq: u32,

    snapshot_buffer: SnapshotBuffer,
    last_server_tick: Option<u32>,

    metrics: Metrics,
    start: Instant,
    last_connect_attempt: Instant,
    last_ping: Instant,
    last_report: Instant,
}

impl<T: Transport> GameClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> anyhow::Result<Self> {
        let server_addr = config.server_addr().parse()?;
        let now = Instant::now();
        Ok(Self {
            transport,
            config,
            server_addr,
            ack_tracker: AckTracker::new(),
            client_id: None,
            state: ClientState::Disconnected,
            local_state: None,
            visual_state: None,
            pending_inputs: Vec::new(),
            input_history: InputHistory::new(),
            local_input_seq: 0,
            snapshot_buffer: SnapshotBuffer::new(),
            last_server_tick: None,
            metrics: Metrics::new(),
            start: now,
            last_connect_attempt: now - Duration::from_secs_f64(CONNECT_RETRY_INTERVAL),
            last_ping: now,
            last_report: now,
        })
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn client_id(&self) -> Option<u8> {
        self.client_id
    }

    pub fn visual_state(&self) -> Option<EntityState> {
        self.visual_state
    }

    pub fn last_server_tick(&self) -> Option<u32> {
        self.last_server_tick
    }

    pub fn remote_entities(&self) -> Vec<EntityState> {
        self.snapshot_buffer.interpolate(self.client_id)
    }

    /// One full tick of client work: drain, connection retry, predict, send,
    /// periodic ping/report.
    pub async fn tick(&mut self, dt: f32, input: InputState) -> anyhow::Result<()> {
        self.drain().await?;

        if self.state == ClientState::Disconnected {
            self.maybe_retry_connect().await;
            return Ok(());
        }

        self.predict(&input, dt);
        self.send_input(&input).await;
        self.maybe_ping().await;
        self.maybe_report();
        Ok(())
    }

    async fn drain(&mut self) -> anyhow::Result<()> {
        loop {
            match self.transport.try_recv_from() {
                Ok((bytes, from)) => self.handle_datagram(&bytes, from).await,
                Err(NetError::TransportWouldBlock) => break,
                Err(NetError::TransportClosed) => {
                    anyhow::bail!("transport closed, shutting down client loop")
                }
                Err(_) => break,
            }
        }
        Ok(())
    }

    async fn handle_datagram(&mut self, bytes: &[u8], from: SocketAddr) {
        if from != self.server_addr {
            return;
        }
        let packet = match Packet::deserialize(bytes) {
            Ok(p) => p,
            Err(e) => {
                debug!(?e, "dropping malformed packet from server");
                return;
            }
        };

        match packet.packet_type {
            PacketType::ConnectAck => self.handle_connect_ack(&packet),
            PacketType::Snapshot => self.handle_snapshot(&packet),
            PacketType::Pong => self.handle_pong(&packet),
            other => debug!(?other, "unexpected packet type at client"),
        }

        self.ack_tracker.on_packet_received(packet.sequence);
        if packet.ack > 0 {
            self.ack_tracker.on_ack_received(packet.ack, packet.ack_bitfield);
        }
    }

    fn handle_connect_ack(&mut self, packet: &Packet) {
        let Some(&id) = packet.payload.first() else {
            return;
        };
        if self.client_id.is_none() {
            info!(client_id = id, "connected to server");
        }
        self.client_id = Some(id);
        self.state = ClientState::Connected;
    }

    fn handle_snapshot(&mut self, packet: &Packet) {
        let Ok(snapshot) = Snapshot::deserialize(&packet.payload) else {
            debug!("dropping malformed snapshot");
            return;
        };
        let offset = snapshot.serialized_size();
        if packet.payload.len() < offset + 4 {
            debug!("snapshot missing trailer, dropping");
            return;
        }
        let mut trailer = &packet.payload[offset..];
        let last_input_seq = trailer.get_u32();

        self.last_server_tick = Some(snapshot.tick);

        if let Some(id) = self.client_id {
            if let Some(server_entity) = snapshot.entities.iter().find(|e| e.entity_id == id) {
                self.reconcile(server_entity, last_input_seq);
            }
        }

        self.snapshot_buffer.push(snapshot);
    }

    fn reconcile(&mut self, server_entity: &EntityState, last_input_seq: u32) {
        if self.local_state.is_none() {
            self.local_state = Some(*server_entity);
            self.visual_state = Some(*server_entity);
            return;
        }

        let dt = self.config.tick_duration().as_secs_f32();
        let result = predict::reconcile(server_entity, last_input_seq, &self.pending_inputs, dt);

        self.local_state = Some(result.corrected_state);
        self.pending_inputs = result.remaining;

        if let Some(error) = result.prediction_error {
            self.metrics.record_prediction_error(error);
            if error > 0.01 {
                debug!(error, "prediction error above threshold");
            }
        }

        if let Some(visual) = self.visual_state {
            self.visual_state = Some(predict::smooth_correction(&visual, &result.corrected_state, 0.3));
        }
    }

    fn handle_pong(&mut self, packet: &Packet) {
        if packet.payload.len() < 8 {
            return;
        }
        let mut buf = &packet.payload[..];
        let sent_at = buf.get_f64();
        let now = self.start.elapsed().as_secs_f64();
        let rtt_ms = (now - sent_at).max(0.0) * 1000.0;
        self.metrics.record_rtt(rtt_ms);
    }

    fn predict(&mut self, input: &InputState, dt: f32) {
        let Some(mut state) = self.local_state else {
            return;
        };
        let record = InputRecord {
            sequence: self.local_input_seq,
            move_x: input.move_x,
            move_y: input.move_y,
            actions: input.actions,
        };
        predict::predict(&mut state, &record, dt);
        self.local_state = Some(state);

        if let Some(visual) = self.visual_state {
            self.visual_state = Some(predict::smooth_correction(&visual, &state, 0.5));
        } else {
            self.visual_state = Some(state);
        }
    }

    async fn send_input(&mut self, input: &InputState) {
        let Some(state) = self.local_state else {
            return;
        };
        self.local_input_seq += 1;
        let record = InputRecord {
            sequence: self.local_input_seq,
            move_x: input.move_x,
            move_y: input.move_y,
            actions: input.actions,
        };

        self.input_history.push(record);
        self.pending_inputs.push(PendingInput {
            input: record,
            predicted_state: state,
        });
        while self.pending_inputs.len() > MAX_PENDING_INPUTS {
            self.pending_inputs.remove(0);
        }

        let payload = self.input_history.redundant_payload();
        self.send_packet(PacketType::Input, payload).await;
    }

    async fn maybe_ping(&mut self) {
        if self.last_ping.elapsed().as_secs_f64() < PING_INTERVAL {
            return;
        }
        self.last_ping = Instant::now();
        let timestamp = self.start.elapsed().as_secs_f64();
        self.send_packet(PacketType::Ping, Bytes::copy_from_slice(&timestamp.to_be_bytes()))
            .await;
    }

    fn maybe_report(&mut self) {
        if self.last_report.elapsed().as_secs_f64() < 1.0 {
            return;
        }
        self.last_report = Instant::now();
        let lost = self.ack_tracker.detect_lost_packets(Duration::from_secs_f64(1.0));
        self.metrics.set_packet_loss(self.ack_tracker.loss_rate());
        if !lost.is_empty() {
            debug!(count = lost.len(), "packets declared lost");
        }
        self.metrics.log_summary("client");
    }

    async fn maybe_retry_connect(&mut self) {
        if self.last_connect_attempt.elapsed().as_secs_f64() < CONNECT_RETRY_INTERVAL {
            return;
        }
        self.last_connect_attempt = Instant::now();
        info!(server = %self.server_addr, "sending CONNECT_REQ");
        self.send_packet(PacketType::ConnectReq, Bytes::new()).await;
    }

    async fn send_packet(&mut self, packet_type: PacketType, payload: Bytes) {
        let sequence = self.ack_tracker.next_sequence();
        let (ack, ack_bitfield) = self.ack_tracker.local_ack_state();
        self.ack_tracker.on_packet_sent(sequence);

        let packet = Packet::new(packet_type, sequence as u32, ack as u32, ack_bitfield as u64, payload);
        let bytes = packet.serialize();
        if self.transport.send_to(&bytes, self.server_addr).await.is_err() {
            warn!(?packet_type, "send failed");
        }
    }
}

/// A default input sampler for headless runs: always the zero vector.
pub fn headless_input() -> InputState {
    InputState {
        move_x: 0.0,
        move_y: 0.0,
        actions: PlayerActions::empty(),
    }
}
