//! Simulated network conditions (`--loss`, `--latency`), layered over a real
//! [`Transport`] for local testing of loss/latency tolerance: drop sends
//! outright at `loss` probability, delay the rest by `latency` seconds.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;

use crate::config::NetworkConditions;
use crate::error::NetError;

use super::Transport;

/// Wraps a [`Transport`], dropping and delaying outgoing sends according to
/// [`NetworkConditions`]. Incoming receives are passed through unmodified,
/// matching the original tool's one-sided simulator (it only perturbs what
/// the local process sends).
pub struct SimulatedTransport<T: Transport> {
    inner: Arc<T>,
    conditions: NetworkConditions,
}

impl<T: Transport + 'static> SimulatedTransport<T> {
    pub fn new(inner: T, conditions: NetworkConditions) -> Self {
        Self {
            inner: Arc::new(inner),
            conditions,
        }
    }
}

#[async_trait]
impl<T: Transport + 'static> Transport for SimulatedTransport<T> {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, NetError> {
        if self.conditions.loss > 0.0 {
            let roll: f32 = rand::thread_rng().gen_range(0.0..1.0);
            if roll < self.conditions.loss {
                return Ok(buf.len());
            }
        }

        if self.conditions.latency > 0.0 {
            let inner = self.inner.clone();
            let payload = Bytes::copy_from_slice(buf);
            let delay = std::time::Duration::from_secs_f32(self.conditions.latency);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = inner.send_to(&payload, target).await;
            });
            return Ok(buf.len());
        }

        self.inner.send_to(buf, target).await
    }

    async fn recv_from(&self) -> Result<(Bytes, SocketAddr), NetError> {
        self.inner.recv_from().await
    }

    fn try_recv_from(&self) -> Result<(Bytes, SocketAddr), NetError> {
        self.inner.try_recv_from()
    }

    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.inner.local_addr()
    }
}
