//! Raw datagram packets for the stream-based architecture

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

/// One datagram received from the device.
///
/// This is the fundamental data unit that flows from a packet source to the
/// decoder.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// Datagram payload (zero-copy via Arc)
    pub data: Arc<[u8]>,

    /// Sender address
    pub source: SocketAddr,

    /// Wall-clock capture time
    pub received_at: SystemTime,
}

impl RawPacket {
    /// Create a new packet stamped with the current time.
    pub fn new(data: Vec<u8>, source: SocketAddr) -> Self {
        Self { data: data.into(), source, received_at: SystemTime::now() }
    }

    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
