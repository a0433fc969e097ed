//! MAROC slow-control field table
//!
//! Bit positions are the LSB position of each field inside the 829-bit serial
//! command. Fields marked `reversed` are stored MSB-first by the chip, so the
//! configured value is bit-reversed before it is packed.

/// Location of one field in the serial command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub position: u16,
    pub width: u8,
    pub reversed: bool,
}

impl FieldLayout {
    const fn bit(position: u16) -> Self {
        Self { position, width: 1, reversed: false }
    }

    const fn reversed(position: u16, width: u8) -> Self {
        Self { position, width, reversed: true }
    }
}

/// Named single-instance fields.
pub static MAROC_FIELDS: &[(&str, FieldLayout)] = &[
    ("OTABG_ON", FieldLayout::bit(0)),
    ("DAC_ON", FieldLayout::bit(1)),
    ("SMALL_DAC", FieldLayout::bit(2)),
    ("DAC2", FieldLayout::reversed(3, 10)),
    ("DAC1", FieldLayout::reversed(13, 10)),
    ("ENB_OUT_ADC", FieldLayout::bit(23)),
    ("INV_START_GRAY", FieldLayout::bit(24)),
    ("RAMP8B", FieldLayout::bit(25)),
    ("RAMP10B", FieldLayout::bit(26)),
    ("CMD_CK_MUX", FieldLayout::bit(155)),
    ("D1_D2", FieldLayout::bit(156)),
    ("INV_DISCR_ADC", FieldLayout::bit(157)),
    ("POLAR_DISCRI", FieldLayout::bit(158)),
    ("ENB3ST", FieldLayout::bit(159)),
    ("VAL_DC_FSB2", FieldLayout::bit(160)),
    ("SW_FSB2_50F", FieldLayout::bit(161)),
    ("SW_FSB2_100F", FieldLayout::bit(162)),
    ("SW_FSB2_100K", FieldLayout::bit(163)),
    ("SW_FSB2_50K", FieldLayout::bit(164)),
    ("VALID_DC_FS", FieldLayout::bit(165)),
    ("CMD_FSB_FSU", FieldLayout::bit(166)),
    ("SW_FSB1_50F", FieldLayout::bit(167)),
    ("SW_FSB1_100F", FieldLayout::bit(168)),
    ("SW_FSB1_100K", FieldLayout::bit(169)),
    ("SW_FSB1_50k", FieldLayout::bit(170)),
    ("SW_FSU_100K", FieldLayout::bit(171)),
    ("SW_FSU_50K", FieldLayout::bit(172)),
    ("SW_FSU_25K", FieldLayout::bit(173)),
    ("SW_FSU_40F", FieldLayout::bit(174)),
    ("SW_FSU_20F", FieldLayout::bit(175)),
    ("H1H2_CHOICE", FieldLayout::bit(176)),
    ("EN_ADC", FieldLayout::bit(177)),
    ("SW_SS_1200F", FieldLayout::bit(178)),
    ("SW_SS_600F", FieldLayout::bit(179)),
    ("SW_SS_300F", FieldLayout::bit(180)),
    ("ON_OFF_SS", FieldLayout::bit(181)),
    ("SWB_BUF_2P", FieldLayout::bit(182)),
    ("SWB_BUF_1P", FieldLayout::bit(183)),
    ("SWB_BUF_500F", FieldLayout::bit(184)),
    ("SWB_BUF_250F", FieldLayout::bit(185)),
    ("CMD_FSB", FieldLayout::bit(186)),
    ("CMD_SS", FieldLayout::bit(187)),
    ("CMD_FSU", FieldLayout::bit(188)),
];

/// Number of input channels per MAROC chip.
pub const CHANNELS: u8 = 64;

/// Per-channel field families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelFamily {
    /// `MASKOR1_<ch>`: bit 154 - 2ch
    MaskOr1,
    /// `MASKOR2_<ch>`: bit 153 - 2ch
    MaskOr2,
    /// `CTEST_<ch>`: bit 828 - ch
    Ctest,
    /// `GAIN<ch>`: 8 bits at 757 - 9ch, reversed
    Gain,
}

impl ChannelFamily {
    pub const ALL: [ChannelFamily; 4] =
        [ChannelFamily::MaskOr1, ChannelFamily::MaskOr2, ChannelFamily::Ctest, ChannelFamily::Gain];

    /// Tag prefix, channel number follows directly.
    pub const fn prefix(self) -> &'static str {
        match self {
            ChannelFamily::MaskOr1 => "MASKOR1_",
            ChannelFamily::MaskOr2 => "MASKOR2_",
            ChannelFamily::Ctest => "CTEST_",
            ChannelFamily::Gain => "GAIN",
        }
    }

    /// Layout of this family's field for `channel` (0-63).
    pub const fn layout(self, channel: u8) -> FieldLayout {
        let ch = channel as u16;
        match self {
            ChannelFamily::MaskOr1 => FieldLayout::bit(154 - 2 * ch),
            ChannelFamily::MaskOr2 => FieldLayout::bit(153 - 2 * ch),
            ChannelFamily::Ctest => FieldLayout::bit(828 - ch),
            ChannelFamily::Gain => FieldLayout::reversed(757 - 9 * ch, 8),
        }
    }

    /// Tag naming this family's field for `channel`.
    pub fn tag(self, channel: u8) -> String {
        format!("{}{}", self.prefix(), channel)
    }

    fn parse(tag: &str) -> Option<(ChannelFamily, u8)> {
        Self::ALL.into_iter().find_map(|family| {
            let channel: u8 = tag.strip_prefix(family.prefix())?.parse().ok()?;
            (channel < CHANNELS).then_some((family, channel))
        })
    }
}

/// Resolve a configuration tag to its register layout.
pub fn lookup(tag: &str) -> Option<FieldLayout> {
    MAROC_FIELDS
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, layout)| *layout)
        .or_else(|| ChannelFamily::parse(tag).map(|(family, channel)| family.layout(channel)))
}
