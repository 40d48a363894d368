//! Structural error taxonomy for the wire protocol and session layer.
//!
//! These are plain enums with `Display`/`Error` impls, matching the style the
//! rest of this crate uses for its own domain errors - not `thiserror`.

use std::fmt;

/// Errors from packet/snapshot decode and session lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// Buffer shorter than the fixed header.
    MalformedPacket,
    /// Protocol identifier didn't match [`crate::codec::PROTOCOL_ID`].
    BadProtocol,
    /// Fewer payload bytes followed the header than `payload_length` declared.
    TruncatedPayload,
    /// Snapshot payload too short for its declared entity count.
    MalformedSnapshot,
    /// Non-blocking receive had nothing to return.
    TransportWouldBlock,
    /// The transport is no longer usable; caller must shut down.
    TransportClosed,
    /// Datagram referenced a client id/address with no live session.
    SessionNotFound,
    /// Server is already at its connected-client limit.
    CapacityExhausted,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::MalformedPacket => write!(f, "packet shorter than the 15-byte header"),
            NetError::BadProtocol => write!(f, "protocol identifier mismatch"),
            NetError::TruncatedPayload => write!(f, "payload shorter than declared length"),
            NetError::MalformedSnapshot => write!(f, "snapshot payload truncated"),
            NetError::TransportWouldBlock => write!(f, "transport would block"),
            NetError::TransportClosed => write!(f, "transport closed"),
            NetError::SessionNotFound => write!(f, "no session for this address"),
            NetError::CapacityExhausted => write!(f, "server at capacity"),
        }
    }
}

impl std::error::Error for NetError {}
