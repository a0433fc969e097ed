//! Science (pulse-height and movie) packet layouts
//!
//! All variants share a 16-byte header:
//!
//! ```text
//!  0      acq_mode    u8
//!  1      packet_ver  u8
//!  2..4   packet_no   u16
//!  4..6   boardloc    u16, rendered 192.168.<hi>.<lo>
//!  6..10  tai         u32 seconds
//! 10..14  nanosec     u32
//! 16..    data        per-variant payload
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;
use crate::types::{FieldSpec, PacketSchema, PrimitiveType, ProtocolVersion, WIRE_PROTOCOL, WireRule};

/// Science header length in bytes.
pub const SCIENCE_HEADER_LEN: usize = 16;

/// Acquisition mode bits as carried in byte 0 of a science packet.
pub mod acq_mode {
    pub const PULSE_HEIGHT: u8 = 0x01;
    pub const IMAGE: u8 = 0x02;
    pub const IMAGE_8BIT: u8 = 0x04;
    pub const NO_BASELINE_SUBTRACT: u8 = 0x10;
}

/// Payload variant of a science packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScienceVariant {
    /// 512 signed 16-bit pulse-height samples
    Ph,
    /// 512 unsigned 16-bit movie pixels
    Movie16,
    /// 256 unsigned 8-bit movie pixels
    Movie8,
}

impl ScienceVariant {
    pub const ALL: [ScienceVariant; 3] =
        [ScienceVariant::Ph, ScienceVariant::Movie16, ScienceVariant::Movie8];

    /// Schema name of the variant.
    pub const fn name(self) -> &'static str {
        match self {
            ScienceVariant::Ph => "ph",
            ScienceVariant::Movie16 => "movie-16bit",
            ScienceVariant::Movie8 => "movie-8bit",
        }
    }

    /// Primitive type of one payload sample.
    pub const fn sample_type(self) -> PrimitiveType {
        match self {
            ScienceVariant::Ph => PrimitiveType::Int16,
            ScienceVariant::Movie16 => PrimitiveType::UInt16,
            ScienceVariant::Movie8 => PrimitiveType::UInt8,
        }
    }

    /// Number of payload samples.
    pub const fn sample_count(self) -> usize {
        match self {
            ScienceVariant::Ph | ScienceVariant::Movie16 => 512,
            ScienceVariant::Movie8 => 256,
        }
    }

    pub const fn payload_len(self) -> usize {
        self.sample_count() * self.sample_type().size()
    }

    pub const fn packet_len(self) -> usize {
        SCIENCE_HEADER_LEN + self.payload_len()
    }

    /// Pick the variant announced by the acquisition mode byte.
    ///
    /// 8-bit movie wins over 16-bit movie, which wins over pulse height.
    pub fn from_acq_mode(mode: u8) -> Option<Self> {
        if mode & acq_mode::IMAGE_8BIT != 0 {
            Some(ScienceVariant::Movie8)
        } else if mode & acq_mode::IMAGE != 0 {
            Some(ScienceVariant::Movie16)
        } else if mode & acq_mode::PULSE_HEIGHT != 0 {
            Some(ScienceVariant::Ph)
        } else {
            None
        }
    }
}

impl fmt::Display for ScienceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn header_fields() -> Vec<FieldSpec> {
    use PrimitiveType::{UInt8, UInt16, UInt32};

    vec![
        FieldSpec::new("acq_mode", 0, 1, UInt8),
        FieldSpec::new("packet_ver", 1, 1, UInt8),
        FieldSpec::new("packet_no", 2, 2, UInt16),
        FieldSpec::new("boardloc", 4, 2, UInt16).with_rule(WireRule::BoardLocation),
        FieldSpec::new("tai", 6, 4, UInt32).with_rule(WireRule::Raw).with_units("s"),
        FieldSpec::new("nanosec", 10, 4, UInt32).with_rule(WireRule::Raw).with_units("ns"),
    ]
}

/// Science schema of one payload variant for the current protocol revision.
pub fn science(variant: ScienceVariant) -> Result<PacketSchema> {
    science_for(variant, WIRE_PROTOCOL)
}

/// Science schema of one payload variant for a given protocol revision.
pub fn science_for(variant: ScienceVariant, version: ProtocolVersion) -> Result<PacketSchema> {
    let mut fields = header_fields();
    fields.push(FieldSpec::new(
        "data",
        SCIENCE_HEADER_LEN,
        variant.payload_len(),
        variant.sample_type(),
    ));
    PacketSchema::new(variant.name(), fields, variant.packet_len(), version)
}

/// First-revision science schema: big-endian header and an opaque signed
/// byte payload running to the end of the datagram.
#[deprecated(note = "use `science` with an explicit `ScienceVariant`")]
pub fn science_legacy() -> Result<PacketSchema> {
    let mut fields = header_fields();
    fields.push(FieldSpec::rest("data", SCIENCE_HEADER_LEN, PrimitiveType::Int8));
    PacketSchema::new("science-legacy", fields, SCIENCE_HEADER_LEN, ProtocolVersion::Legacy)
}
