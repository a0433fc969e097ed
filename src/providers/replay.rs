//! Replay source for recorded datagrams

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::provider::PacketSource;
use crate::types::{PacketSchema, RawPacket};
use crate::{QuaboError, Result};

/// Replays captured datagrams at a fixed rate
pub struct ReplaySource {
    /// Remaining packets
    packets: VecDeque<RawPacket>,

    /// Total packets loaded
    total: usize,

    /// Playback speed multiplier (1.0 = recorded rate)
    speed: f64,

    /// Packet pacing interval
    interval: Interval,

    schema: Arc<PacketSchema>,

    /// Recorded packet rate
    rate_hz: f64,
}

impl ReplaySource {
    /// Replay `packets` at `rate_hz`.
    pub fn new(packets: Vec<RawPacket>, schema: Arc<PacketSchema>, rate_hz: f64) -> Result<Self> {
        if !(rate_hz.is_finite() && rate_hz > 0.0) {
            return Err(QuaboError::config("replay", format!("invalid replay rate {rate_hz}")));
        }

        let total = packets.len();
        info!("Replaying {} {} packets at {}Hz", total, schema.name, rate_hz);

        Ok(Self {
            packets: packets.into(),
            total,
            speed: 1.0,
            interval: Self::pacing(rate_hz),
            schema,
            rate_hz,
        })
    }

    fn pacing(hz: f64) -> Interval {
        let mut interval = interval(Duration::from_secs_f64(1.0 / hz));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Set playback speed
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.1, 100.0);
        self.interval = Self::pacing(self.rate_hz * self.speed);
        debug!("Playback speed set to {}x", self.speed);
    }

    /// Packets not yet replayed.
    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

#[async_trait::async_trait]
impl PacketSource for ReplaySource {
    async fn next_packet(&mut self) -> Result<Option<RawPacket>> {
        if self.packets.is_empty() {
            debug!("Reached end of replay");
            return Ok(None);
        }

        self.interval.tick().await;

        let packet = self.packets.pop_front();
        trace!("Replay packet {}/{}", self.total - self.packets.len(), self.total);
        Ok(packet)
    }

    fn schema(&self) -> Arc<PacketSchema> {
        Arc::clone(&self.schema)
    }

    fn packet_rate(&self) -> Option<f64> {
        Some(self.rate_hz * self.speed)
    }
}
