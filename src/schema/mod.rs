//! Built-in packet layouts
//!
//! The device sends two kinds of telemetry:
//! - housekeeping packets (64 bytes) on port 60002
//! - science packets on port 60001, a 16-byte header plus a payload whose
//!   shape depends on the acquisition mode (see [`ScienceVariant`])
//!
//! Every builder returns a validated [`PacketSchema`](crate::PacketSchema)
//! tagged with its protocol revision. The current revision is little-endian;
//! the `_for` variants build the same layout for the legacy big-endian one.

mod housekeeping;
mod science;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;
use crate::types::{PacketSchema, ProtocolVersion};

pub use housekeeping::{
    HOUSEKEEPING_LEN, HVIMON_CONSTANT, HVIMON_LSB, HVMON_LSB, housekeeping, housekeeping_for,
};
#[allow(deprecated)]
pub use science::science_legacy;
pub use science::{SCIENCE_HEADER_LEN, ScienceVariant, acq_mode, science, science_for};

/// Selects one of the built-in layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    Housekeeping,
    Science(ScienceVariant),
}

impl PacketKind {
    /// Build the schema for this kind.
    pub fn schema(self, version: ProtocolVersion) -> Result<PacketSchema> {
        match self {
            PacketKind::Housekeeping => housekeeping_for(version),
            PacketKind::Science(variant) => science_for(variant, version),
        }
    }

    /// Receive buffer size that holds one packet of this kind.
    pub const fn packet_len(self) -> usize {
        match self {
            PacketKind::Housekeeping => HOUSEKEEPING_LEN,
            PacketKind::Science(variant) => variant.packet_len(),
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Housekeeping => f.write_str("housekeeping"),
            PacketKind::Science(variant) => write!(f, "science/{variant}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldLength, PrimitiveType, WireRule};

    #[test]
    fn housekeeping_layout() {
        let schema = housekeeping().unwrap();
        assert_eq!(schema.packet_len, 64);
        assert_eq!(schema.field_count(), 28);
        assert_eq!(schema.required_len(), 64);

        let hvmon3 = schema.get_field("hvmon3").unwrap();
        assert_eq!(hvmon3.offset, 10);
        assert_eq!(hvmon3.scale.unwrap().lsb, HVMON_LSB);

        let sensor = schema.get_field("sensor_status").unwrap();
        assert_eq!((sensor.offset, sensor.bit), (52, Some(1)));

        assert_eq!(schema.get_field("boardloc").unwrap().rule, WireRule::BoardLocation);
        assert_eq!(schema.get_field("fwver").unwrap().rule, WireRule::ReversedText);
        assert_eq!(schema.get_field("uid").unwrap().rule, WireRule::Raw);
        assert_eq!(schema.get_field("uid").unwrap().data_type, PrimitiveType::UInt64);
    }

    #[test]
    fn housekeeping_versions_share_layout() {
        let current = housekeeping_for(ProtocolVersion::Current).unwrap();
        let legacy = housekeeping_for(ProtocolVersion::Legacy).unwrap();
        assert_eq!(current.fields(), legacy.fields());
        assert_ne!(current.version, legacy.version);
    }

    #[test]
    fn science_variants() {
        for variant in ScienceVariant::ALL {
            let schema = science(variant).unwrap();
            let data = schema.get_field("data").unwrap();
            assert_eq!(data.offset, SCIENCE_HEADER_LEN);
            assert_eq!(data.count(), Some(variant.sample_count()));
            assert_eq!(data.data_type, variant.sample_type());
            assert_eq!(schema.required_len(), variant.packet_len());
            assert_eq!(schema.get_field("boardloc").unwrap().offset, 4);
        }

        assert_eq!(ScienceVariant::Ph.packet_len(), 16 + 1024);
        assert_eq!(ScienceVariant::Movie16.packet_len(), 16 + 1024);
        assert_eq!(ScienceVariant::Movie8.packet_len(), 16 + 256);
    }

    #[test]
    fn variant_from_acq_mode() {
        assert_eq!(ScienceVariant::from_acq_mode(0x01), Some(ScienceVariant::Ph));
        assert_eq!(ScienceVariant::from_acq_mode(0x02), Some(ScienceVariant::Movie16));
        assert_eq!(ScienceVariant::from_acq_mode(0x06), Some(ScienceVariant::Movie8));
        assert_eq!(ScienceVariant::from_acq_mode(0x13), Some(ScienceVariant::Movie16));
        assert_eq!(ScienceVariant::from_acq_mode(0x10), None);
    }

    #[test]
    #[allow(deprecated)]
    fn legacy_science_uses_rest_sentinel() {
        let schema = science_legacy().unwrap();
        assert_eq!(schema.version, ProtocolVersion::Legacy);
        assert_eq!(schema.get_field("data").unwrap().length, FieldLength::Rest);
        assert_eq!(schema.required_len(), SCIENCE_HEADER_LEN);
    }

    #[test]
    fn packet_kind_builds_matching_schema() {
        let kind = PacketKind::Science(ScienceVariant::Movie8);
        let schema = kind.schema(ProtocolVersion::Current).unwrap();
        assert_eq!(schema.name, "movie-8bit");
        assert_eq!(kind.packet_len(), schema.packet_len);
        assert_eq!(kind.to_string(), "science/movie-8bit");
        assert_eq!(PacketKind::Housekeeping.packet_len(), 64);
    }
}
