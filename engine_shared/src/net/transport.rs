//! The [`Transport`] trait abstracts sending and receiving datagrams so the
//! client and server loops can run against a real [`tokio::net::UdpSocket`]
//! in production and an in-memory [`MockTransport`] in tests, without any
//! conditional compilation.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::error::NetError;

/// A datagram transport: something a client or server can send to and
/// receive from by address.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `buf` to `target`, returning the number of bytes sent.
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, NetError>;

    /// Awaits the next datagram, blocking the calling task until one arrives.
    async fn recv_from(&self) -> Result<(Bytes, SocketAddr), NetError>;

    /// Non-blocking receive, for drain loops that must not await. Returns
    /// [`NetError::TransportWouldBlock`] if nothing is queued.
    fn try_recv_from(&self) -> Result<(Bytes, SocketAddr), NetError>;

    /// The local address this transport is bound to.
    fn local_addr(&self) -> Result<SocketAddr, NetError>;
}

/// Production transport backed by a real UDP socket.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket })
    }

    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, NetError> {
        self.socket
            .send_to(buf, target)
            .await
            .map_err(|_| NetError::TransportClosed)
    }

    async fn recv_from(&self) -> Result<(Bytes, SocketAddr), NetError> {
        let mut buf = vec![0u8; crate::constants::DEFAULT_BUFFER_SIZE];
        let (len, addr) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(|_| NetError::TransportClosed)?;
        buf.truncate(len);
        Ok((Bytes::from(buf), addr))
    }

    fn try_recv_from(&self) -> Result<(Bytes, SocketAddr), NetError> {
        let mut buf = vec![0u8; crate::constants::DEFAULT_BUFFER_SIZE];
        match self.socket.try_recv_from(&mut buf) {
            Ok((len, addr)) => {
                buf.truncate(len);
                Ok((Bytes::from(buf), addr))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                Err(NetError::TransportWouldBlock)
            }
            Err(_) => Err(NetError::TransportClosed),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.socket.local_addr().map_err(|_| NetError::TransportClosed)
    }
}

type Registry = Arc<Mutex<HashMap<SocketAddr, mpsc::UnboundedSender<(Bytes, SocketAddr)>>>>;

/// A shared in-memory "network" that [`MockTransport`] instances register
/// with, so tests can run a client and server against each other without a
/// real socket.
#[derive(Clone, Default)]
pub struct MockNetwork {
    registry: Registry,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport bound to `addr` on this mock network.
    pub fn bind(&self, addr: SocketAddr) -> MockTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.lock().unwrap().insert(addr, tx);
        MockTransport {
            local_addr: addr,
            receiver: Mutex::new(rx),
            registry: self.registry.clone(),
        }
    }
}

/// An in-memory [`Transport`] for tests, addressed by [`SocketAddr`] like a
/// real socket but delivering datagrams through channels instead of the OS.
pub struct MockTransport {
    local_addr: SocketAddr,
    receiver: Mutex<mpsc::UnboundedReceiver<(Bytes, SocketAddr)>>,
    registry: Registry,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, NetError> {
        let sender = self
            .registry
            .lock()
            .unwrap()
            .get(&target)
            .cloned()
            .ok_or(NetError::SessionNotFound)?;
        sender
            .send((Bytes::copy_from_slice(buf), self.local_addr))
            .map_err(|_| NetError::TransportClosed)?;
        Ok(buf.len())
    }

    async fn recv_from(&self) -> Result<(Bytes, SocketAddr), NetError> {
        let mut receiver = self.receiver.lock().unwrap();
        receiver.recv().await.ok_or(NetError::TransportClosed)
    }

    fn try_recv_from(&self) -> Result<(Bytes, SocketAddr), NetError> {
        let mut receiver = self.receiver.lock().unwrap();
        match receiver.try_recv() {
            Ok(datagram) => Ok(datagram),
            Err(mpsc::error::TryRecvError::Empty) => Err(NetError::TransportWouldBlock),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(NetError::TransportClosed),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.local_addr)
    }
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, NetError> {
        (**self).send_to(buf, target).await
    }

    async fn recv_from(&self) -> Result<(Bytes, SocketAddr), NetError> {
        (**self).recv_from().await
    }

    fn try_recv_from(&self) -> Result<(Bytes, SocketAddr), NetError> {
        (**self).try_recv_from()
    }

    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        (**self).local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_delivers_between_two_endpoints() {
        let net = MockNetwork::new();
        let a_addr: SocketAddr = "127.0.0.1:40001".parse().unwrap();
        let b_addr: SocketAddr = "127.0.0.1:40002".parse().unwrap();
        let a = net.bind(a_addr);
        let b = net.bind(b_addr);

        a.send_to(b"hello", b_addr).await.unwrap();
        let (data, from) = b.recv_from().await.unwrap();
        assert_eq!(&data[..], b"hello");
        assert_eq!(from, a_addr);
    }

    #[tokio::test]
    async fn try_recv_from_reports_would_block_when_empty() {
        let net = MockNetwork::new();
        let addr: SocketAddr = "127.0.0.1:40003".parse().unwrap();
        let t = net.bind(addr);
        assert_eq!(
            t.try_recv_from().unwrap_err(),
            NetError::TransportWouldBlock
        );
    }

    #[tokio::test]
    async fn send_to_unknown_address_fails() {
        let net = MockNetwork::new();
        let a = net.bind("127.0.0.1:40004".parse().unwrap());
        let unknown: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        assert_eq!(
            a.send_to(b"x", unknown).await.unwrap_err(),
            NetError::SessionNotFound
        );
    }
}
