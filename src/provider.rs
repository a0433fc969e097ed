//! Packet source trait for telemetry streams

use std::sync::Arc;

use crate::Result;
use crate::types::{PacketSchema, RawPacket};

/// Trait for raw datagram sources
///
/// Sources abstract over where datagrams come from (a device port, a
/// recorded capture) and handle their own timing internally.
#[async_trait::async_trait]
pub trait PacketSource: Send + 'static {
    /// Wait for the next datagram
    ///
    /// Returns:
    /// - `Ok(Some(packet))` - datagram available
    /// - `Ok(None)` - source ended (normal termination)
    /// - `Err(e)` - transport error
    ///
    /// Receive timeouts are not errors; a live source keeps waiting.
    async fn next_packet(&mut self) -> Result<Option<RawPacket>>;

    /// Schema datagrams from this source are decoded with.
    fn schema(&self) -> Arc<PacketSchema>;

    /// Nominal packet rate in Hz, if known.
    fn packet_rate(&self) -> Option<f64> {
        None
    }
}
