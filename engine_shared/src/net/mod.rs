//! Datagram transport abstraction.

mod simulate;
mod transport;

pub use simulate::SimulatedTransport;
pub use transport::{MockNetwork, MockTransport, Transport, UdpTransport};
