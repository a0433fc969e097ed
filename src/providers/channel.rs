//! Live packet source reading from a device channel

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::Result;
use crate::provider::PacketSource;
use crate::transport::{Channel, MAX_DATAGRAM_LEN};
use crate::types::{PacketSchema, RawPacket};

/// Default wait per receive call before polling again.
pub const DEFAULT_POLL: Duration = Duration::from_millis(500);

/// Source that pulls datagrams off a [`Channel`]
pub struct ChannelSource<C> {
    channel: C,
    schema: Arc<PacketSchema>,
    max_len: usize,
    poll: Duration,
    packet_rate: Option<f64>,
}

impl<C: Channel> ChannelSource<C> {
    /// Read datagrams sized for `schema` from `channel`.
    pub fn new(channel: C, schema: Arc<PacketSchema>) -> Self {
        let max_len = MAX_DATAGRAM_LEN.max(schema.packet_len);
        Self { channel, schema, max_len, poll: DEFAULT_POLL, packet_rate: None }
    }

    /// Set how long each receive waits before polling again.
    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Declare the rate the device sends at.
    pub fn with_packet_rate(mut self, hz: f64) -> Self {
        self.packet_rate = Some(hz);
        self
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }
}

#[async_trait::async_trait]
impl<C: Channel> PacketSource for ChannelSource<C> {
    async fn next_packet(&mut self) -> Result<Option<RawPacket>> {
        loop {
            if let Some(packet) = self.channel.receive(self.max_len, self.poll).await? {
                return Ok(Some(packet));
            }
            trace!("No {} datagram within {:?}, waiting", self.schema.name, self.poll);
        }
    }

    fn schema(&self) -> Arc<PacketSchema> {
        Arc::clone(&self.schema)
    }

    fn packet_rate(&self) -> Option<f64> {
        self.packet_rate
    }
}
