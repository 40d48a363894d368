//! Per-client session registry, indexed by both client id and transport address.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use engine_shared::ack::AckTracker;
use engine_shared::constants::CLIENT_TIMEOUT;
use engine_shared::input::InputRecord;

/// Server-side state for one connected client.
pub struct ClientSession {
    pub client_id: u8,
    pub address: SocketAddr,
    pub last_heard: Instant,
    pub last_processed_input_seq: u32,
    pub pending_inputs: Vec<InputRecord>,
    pub ack_tracker: AckTracker,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl ClientSession {
    fn new(client_id: u8, address: SocketAddr) -> Self {
        Self {
            client_id,
            address,
            last_heard: Instant::now(),
            last_processed_input_seq: 0,
            pending_inputs: Vec::new(),
            ack_tracker: AckTracker::new(),
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// Appends `record` to the pending queue unless an input with the same
    /// sequence is already queued.
    pub fn enqueue_input(&mut self, record: InputRecord) {
        if !self.pending_inputs.iter().any(|p| p.sequence == record.sequence) {
            self.pending_inputs.push(record);
        }
    }
}

/// Registry of connected clients, keyed by client id with a secondary index
/// by transport address.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<u8, ClientSession>,
    addr_to_id: HashMap<SocketAddr, u8>,
    next_id: u8,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            addr_to_id: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn has_address(&self, address: &SocketAddr) -> bool {
        self.addr_to_id.contains_key(address)
    }

    pub fn get_by_address(&self, address: &SocketAddr) -> Option<&ClientSession> {
        self.addr_to_id
            .get(address)
            .and_then(|id| self.clients.get(id))
    }

    pub fn get_by_address_mut(&mut self, address: &SocketAddr) -> Option<&mut ClientSession> {
        let id = *self.addr_to_id.get(address)?;
        self.clients.get_mut(&id)
    }

    pub fn get_mut(&mut self, client_id: u8) -> Option<&mut ClientSession> {
        self.clients.get_mut(&client_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &ClientSession> {
        self.clients.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut ClientSession> {
        self.clients.values_mut()
    }

    /// Registers a new session for `address`, returning its assigned id.
    /// Capacity is bounded by `u8`'s range (255 simultaneous clients).
    pub fn add(&mut self, address: SocketAddr) -> Option<u8> {
        if self.next_id == 0 {
            return None; // wrapped past 255 clients without eviction
        }
        let id = self.next_id;
        self.next_id = self.next_id.checked_add(1).unwrap_or(0);
        self.clients.insert(id, ClientSession::new(id, address));
        self.addr_to_id.insert(address, id);
        Some(id)
    }

    pub fn remove(&mut self, client_id: u8) -> Option<ClientSession> {
        let session = self.clients.remove(&client_id)?;
        self.addr_to_id.remove(&session.address);
        Some(session)
    }

    /// Returns the ids of sessions that have been silent longer than
    /// [`CLIENT_TIMEOUT`].
    pub fn check_timeouts(&self) -> Vec<u8> {
        let now = Instant::now();
        self.clients
            .values()
            .filter(|c| now.duration_since(c.last_heard).as_secs_f64() > CLIENT_TIMEOUT)
            .map(|c| c.client_id)
            .collect()
    }
}
