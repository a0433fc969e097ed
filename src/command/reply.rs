//! Parsers for command replies

use serde::Serialize;
use std::fmt;

use crate::{QuaboError, Result};

/// Number of pulse-height baseline values the device returns.
pub const PH_BASELINE_VALUES: usize = 256;

/// Ethernet MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Reply to the data-destination command: MACs the device resolved for the
/// pulse-height and movie destinations.
pub fn parse_destination_reply(reply: &[u8]) -> Result<(MacAddress, MacAddress)> {
    let bytes: &[u8; 12] = reply.try_into().map_err(|_| {
        QuaboError::command(format!("destination reply is {} bytes, expected 12", reply.len()))
    })?;
    let mut ph = [0u8; 6];
    let mut movie = [0u8; 6];
    ph.copy_from_slice(&bytes[..6]);
    movie.copy_from_slice(&bytes[6..]);
    Ok((MacAddress(ph), MacAddress(movie)))
}

/// Reply to the baseline calibration: 256 little-endian u16 starting at byte 4.
pub fn parse_ph_baseline(reply: &[u8]) -> Result<Vec<u16>> {
    let payload = reply.get(4..4 + 2 * PH_BASELINE_VALUES).ok_or_else(|| {
        QuaboError::command(format!(
            "baseline reply is {} bytes, expected at least {}",
            reply.len(),
            4 + 2 * PH_BASELINE_VALUES
        ))
    })?;
    Ok(payload.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect())
}
