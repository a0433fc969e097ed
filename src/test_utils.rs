//! Test utilities for building synthetic device packets
//!
//! Used by unit tests and the benchmarks to produce housekeeping and science
//! datagrams in the current (little-endian) wire format without a device.

#![cfg(any(test, feature = "benchmark"))]

use crate::schema::{HOUSEKEEPING_LEN, SCIENCE_HEADER_LEN, ScienceVariant, acq_mode};

/// Builder for 64-byte housekeeping packets.
#[derive(Debug, Clone)]
pub struct HousekeepingBuilder {
    bytes: [u8; HOUSEKEEPING_LEN],
}

impl Default for HousekeepingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HousekeepingBuilder {
    pub fn new() -> Self {
        Self { bytes: [0; HOUSEKEEPING_LEN] }
    }

    /// Write a little-endian u16 at `offset`.
    pub fn raw_u16(mut self, offset: usize, value: u16) -> Self {
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// Write raw bytes at `offset`.
    pub fn raw_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn boardloc(self, packed: u16) -> Self {
        self.raw_u16(2, packed)
    }

    /// Raw reading for `hvmon<channel>`.
    pub fn hvmon(self, channel: usize, raw: u16) -> Self {
        self.raw_u16(4 + 2 * channel, raw)
    }

    pub fn uid(mut self, uid: u64) -> Self {
        self.bytes[44..52].copy_from_slice(&uid.to_le_bytes());
        self
    }

    pub fn fwtime(mut self, fwtime: u32) -> Self {
        self.bytes[56..60].copy_from_slice(&fwtime.to_le_bytes());
        self
    }

    /// Firmware version as read by a human; stored reversed like the device does.
    pub fn fwver(mut self, version: &str) -> Self {
        let mut wire = [0u8; 4];
        for (slot, byte) in wire.iter_mut().zip(version.bytes().rev()) {
            *slot = byte;
        }
        self.bytes[60..64].copy_from_slice(&wire);
        self
    }

    /// Status bytes: byte 52 (shutter bit 0, sensor bit 1) and byte 53 (pcb revision bit 0).
    pub fn status(mut self, status: u8, pcbrev: u8) -> Self {
        self.bytes[52] = status;
        self.bytes[53] = pcbrev;
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

/// Build a science packet for `variant`.
///
/// `samples` are truncated or zero-padded to the variant's sample count and
/// narrowed to its sample width.
pub fn science_packet(variant: ScienceVariant, packet_no: u16, boardloc: u16, samples: &[i16]) -> Vec<u8> {
    let mut packet = vec![0u8; variant.packet_len()];
    packet[0] = match variant {
        ScienceVariant::Ph => acq_mode::PULSE_HEIGHT,
        ScienceVariant::Movie16 => acq_mode::IMAGE,
        ScienceVariant::Movie8 => acq_mode::IMAGE | acq_mode::IMAGE_8BIT,
    };
    packet[1] = 1;
    packet[2..4].copy_from_slice(&packet_no.to_le_bytes());
    packet[4..6].copy_from_slice(&boardloc.to_le_bytes());

    let payload = &mut packet[SCIENCE_HEADER_LEN..];
    for (i, &sample) in samples.iter().take(variant.sample_count()).enumerate() {
        match variant {
            ScienceVariant::Ph | ScienceVariant::Movie16 => {
                payload[2 * i..2 * i + 2].copy_from_slice(&sample.to_le_bytes());
            }
            ScienceVariant::Movie8 => payload[i] = sample as u8,
        }
    }
    packet
}
