//! Datagram channels to the device
//!
//! The device talks on three fixed UDP ports. Each [`Channel`] is bound to one
//! of them and only accepts datagrams from the configured device address.

mod udp;

pub use udp::UdpChannel;

use std::time::Duration;

use crate::Result;
use crate::types::RawPacket;

/// Command port; replies to commands also arrive here.
pub const COMMAND_PORT: u16 = 60000;

/// Science (pulse-height and movie) data port.
pub const DATA_PORT: u16 = 60001;

/// Housekeeping port.
pub const HK_PORT: u16 = 60002;

/// Largest datagram the device sends.
pub const MAX_DATAGRAM_LEN: usize = 2048;

/// Datagrams drained by a default flush.
pub const FLUSH_LIMIT: usize = 32;

/// Byte-oriented link to one device port.
#[async_trait::async_trait]
pub trait Channel: Send + Sync + 'static {
    /// Send one datagram to the device.
    async fn send(&self, bytes: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for a datagram from the device.
    ///
    /// Returns:
    /// - `Ok(Some(packet))` - datagram received, truncated to `max_len`
    /// - `Ok(None)` - nothing arrived before the deadline
    /// - `Err(e)` - socket error
    async fn receive(&self, max_len: usize, timeout: Duration) -> Result<Option<RawPacket>>;

    /// Drop up to `max_datagrams` already-queued datagrams.
    ///
    /// Returns the number of datagrams discarded.
    async fn flush(&self, max_datagrams: usize) -> Result<usize> {
        let mut count = 0;
        while count < max_datagrams {
            if self.receive(MAX_DATAGRAM_LEN, Duration::ZERO).await?.is_none() {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}
