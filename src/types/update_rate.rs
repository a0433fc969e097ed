//! Delivery rate for record subscriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a subscriber wants records.
///
/// Housekeeping arrives at about 1 Hz while science packets can arrive at
/// tens of kHz, so subscribers to science data usually cap the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every record the device sends
    Native,

    /// At most this many records per second, newest wins
    Max(u32),
}

impl UpdateRate {
    /// Effective rate given the packet rate of the source.
    ///
    /// `Max(0)` and caps at or above `packet_hz` collapse to `Native`. An
    /// unknown packet rate keeps the cap.
    pub fn normalize(self, packet_hz: Option<f64>) -> Self {
        match (self, packet_hz) {
            (UpdateRate::Max(0), _) => UpdateRate::Native,
            (UpdateRate::Max(hz), Some(packet_hz)) if f64::from(hz) >= packet_hz => {
                UpdateRate::Native
            }
            (rate, _) => rate,
        }
    }

    /// Minimum spacing between delivered records, or `None` for no throttling.
    pub fn throttle_period(self, packet_hz: Option<f64>) -> Option<Duration> {
        match self.normalize(packet_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}
