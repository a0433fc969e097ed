//! MAROC serial register builder
//!
//! Each of the four MAROC chips on a board is configured through an 829-bit
//! serial command, held here as a 104-byte [`ChipRegisterImage`]. Fields are
//! packed with a clear-then-OR merge, so writes to distinct fields commute and
//! rewriting a field is idempotent.
//!
//! Images are built fresh per command and returned by value; nothing is
//! shared between builds.
//!
//! ```rust
//! use quabo::register::{RegisterImages, SetBits};
//!
//! let mut images = RegisterImages::new();
//! assert_eq!(images.set_bits(0, 3, 10, 0x3ff), SetBits::Applied);
//! assert_eq!(images.chip(0).unwrap().get_bits(3, 10), 0x3ff);
//!
//! // Past the end of the serial command: skipped, image untouched.
//! assert_eq!(images.set_bits(0, 825, 8, 0xff), SetBits::Skipped);
//! ```

mod fields;

use tracing::{debug, warn};

use crate::{QuaboError, Result};

pub use fields::{CHANNELS, ChannelFamily, FieldLayout, MAROC_FIELDS, lookup};

/// Number of MAROC chips per board.
pub const CHIP_COUNT: usize = 4;

/// Bytes per chip register image.
pub const CHIP_IMAGE_LEN: usize = 104;

/// Length of the serial command in bits.
pub const SERIAL_COMMAND_BITS: usize = 829;

/// Widest field a single write may set.
pub const MAX_FIELD_WIDTH: u8 = 16;

/// Outcome of a bit write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum SetBits {
    Applied,
    /// Out of range (width above 16, past bit 829, or no such chip); image unchanged
    Skipped,
}

/// Reverse the low `width` bits of `value`.
pub fn reverse_bits(value: u32, width: u8) -> u32 {
    if width == 0 {
        return 0;
    }
    let width = u32::from(width.min(32));
    (value.reverse_bits() >> (32 - width)) & low_mask(width)
}

fn low_mask(width: u32) -> u32 {
    if width >= 32 { u32::MAX } else { (1 << width) - 1 }
}

/// Serial register image of one chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipRegisterImage([u8; CHIP_IMAGE_LEN]);

impl Default for ChipRegisterImage {
    fn default() -> Self {
        Self([0; CHIP_IMAGE_LEN])
    }
}

impl ChipRegisterImage {
    pub fn as_bytes(&self) -> &[u8; CHIP_IMAGE_LEN] {
        &self.0
    }

    /// Merge `value` into `width` bits starting at `lsb_pos`.
    ///
    /// Only the target bits change. `value` is masked to `width` bits.
    pub fn set_bits(&mut self, lsb_pos: usize, width: u8, value: u32) -> SetBits {
        if width > MAX_FIELD_WIDTH || lsb_pos + usize::from(width) > SERIAL_COMMAND_BITS {
            return SetBits::Skipped;
        }

        let width = u32::from(width);
        let shift = (lsb_pos % 8) as u32;
        let byte = lsb_pos / 8;
        let mask = low_mask(width) << shift;
        let bits = (value & low_mask(width)) << shift;

        // A 16-bit field at shift 7 touches three bytes.
        for (i, slot) in self.0[byte..].iter_mut().take(3).enumerate() {
            let (m, v) = ((mask >> (8 * i)) as u8, (bits >> (8 * i)) as u8);
            if m == 0 {
                break;
            }
            *slot = (*slot & !m) | v;
        }
        SetBits::Applied
    }

    /// Read back `width` bits starting at `lsb_pos`.
    ///
    /// `width` is clamped to [`MAX_FIELD_WIDTH`]; bits past the image read as 0.
    pub fn get_bits(&self, lsb_pos: usize, width: u8) -> u32 {
        (0..usize::from(width.min(MAX_FIELD_WIDTH)))
            .map(|i| lsb_pos + i)
            .filter(|&pos| pos / 8 < CHIP_IMAGE_LEN)
            .fold(0, |acc, pos| acc | (u32::from((self.0[pos / 8] >> (pos % 8)) & 1) << (pos - lsb_pos)))
    }
}

/// The four chip images of one register command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterImages {
    chips: [ChipRegisterImage; CHIP_COUNT],
}

impl RegisterImages {
    /// All-zero images.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chip(&self, index: usize) -> Option<&ChipRegisterImage> {
        self.chips.get(index)
    }

    pub fn chips(&self) -> &[ChipRegisterImage; CHIP_COUNT] {
        &self.chips
    }

    /// Set a field on one chip.
    pub fn set_bits(&mut self, chip: usize, lsb_pos: usize, width: u8, value: u32) -> SetBits {
        let result = match self.chips.get_mut(chip) {
            Some(image) => image.set_bits(lsb_pos, width, value),
            None => SetBits::Skipped,
        };
        if result == SetBits::Skipped {
            warn!(chip, lsb_pos, width, value, "register write out of range, skipped");
        }
        result
    }

    /// Set the same field on all four chips, one value per chip.
    pub fn set_bits_4(
        &mut self,
        field: &str,
        values: &[u32],
        lsb_pos: usize,
        width: u8,
    ) -> Result<SetBits> {
        if values.len() != CHIP_COUNT {
            return Err(QuaboError::Arity {
                field: field.to_string(),
                expected: CHIP_COUNT,
                actual: values.len(),
            });
        }

        let mut outcome = SetBits::Applied;
        for (chip, &value) in values.iter().enumerate() {
            if self.set_bits(chip, lsb_pos, width, value) == SetBits::Skipped {
                outcome = SetBits::Skipped;
            }
        }
        Ok(outcome)
    }

    /// Apply a configuration tag with its four per-chip values.
    ///
    /// Returns `Ok(None)` for tags that name no register field.
    pub fn apply(&mut self, tag: &str, values: &[u32]) -> Result<Option<SetBits>> {
        let Some(layout) = lookup(tag) else {
            return Ok(None);
        };

        let values: Vec<u32> = if layout.reversed {
            values.iter().map(|&v| reverse_bits(v, layout.width)).collect()
        } else {
            values.to_vec()
        };
        debug!(tag, ?values, position = layout.position, width = layout.width, "set MAROC field");
        self.set_bits_4(tag, &values, usize::from(layout.position), layout.width).map(Some)
    }

    /// Build images from `(tag, values)` settings, in any order.
    ///
    /// Unknown tags are logged and ignored.
    pub fn from_settings<'a, I, V>(settings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: AsRef<[u32]>,
    {
        let mut images = Self::new();
        for (tag, values) in settings {
            if images.apply(tag, values.as_ref())?.is_none() {
                warn!(tag, "unknown MAROC tag ignored");
            }
        }
        Ok(images)
    }
}

#[cfg(test)]
mod tests;
