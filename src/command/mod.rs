//! Command frames for the device control port
//!
//! Simple commands are 64-byte frames with the opcode in byte 0. The MAROC
//! register command is a 492-byte frame carrying the four chip images at
//! fixed offsets:
//!
//! ```text
//!   0        opcode (0x01, or 0x81 to request an echo)
//!   1..4     zero
//!   4..108   chip 0 image      108..132  reserved
//! 132..236   chip 1 image      236..260  reserved
//! 260..364   chip 2 image      364..388  reserved
//! 388..492   chip 3 image
//! ```
//!
//! The device rewrites the reserved ranges when it echoes the frame back, so
//! [`CommandFrame::verify_echo`] skips them and compares everything else.

mod builders;
mod params;
mod reply;
pub mod units;

use std::fmt;
use std::net::Ipv4Addr;
use std::ops::Range;

use crate::register::{CHIP_IMAGE_LEN, RegisterImages};
use crate::{QuaboError, Result};

pub use builders::{HV_CHANNELS, MAX_CHANMASK_INDEX};
pub use params::{AcqParams, DaqParams, FlashParams, ShutterState, StimParams};
pub use reply::{MacAddress, PH_BASELINE_VALUES, parse_destination_reply, parse_ph_baseline};

/// Length of a simple command frame.
pub const COMMAND_FRAME_LEN: usize = 64;

/// Length of the MAROC register command frame.
pub const REGISTER_FRAME_LEN: usize = 492;

/// Byte offset of each chip image inside the register frame.
pub const CHIP_IMAGE_OFFSETS: [usize; 4] = [4, 132, 260, 388];

/// Ranges the device rewrites in an echoed register frame.
pub const RESERVED_ECHO_RANGES: [Range<usize>; 3] = [108..132, 236..260, 364..388];

/// Command opcodes (byte 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Register = 0x01,
    RegisterEcho = 0x81,
    HighVoltage = 0x02,
    AcqParams = 0x03,
    Reset = 0x04,
    Focus = 0x05,
    Fan = 0x85,
    TriggerMask = 0x06,
    PhBaseline = 0x07,
    Shutter = 0x08,
    LedFlasher = 0x09,
    DataDestinations = 0x0a,
    HkDestination = 0x0b,
    GoeMask = 0x0e,
}

impl Opcode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Frame length the opcode is sent with.
    pub const fn frame_len(self) -> usize {
        match self {
            Opcode::Register | Opcode::RegisterEcho => REGISTER_FRAME_LEN,
            _ => COMMAND_FRAME_LEN,
        }
    }

    /// Length of the reply the device sends, if any.
    pub const fn reply_len(self) -> Option<usize> {
        match self {
            Opcode::RegisterEcho => Some(REGISTER_FRAME_LEN),
            Opcode::DataDestinations => Some(12),
            Opcode::PhBaseline => Some(4 + 2 * 256),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = QuaboError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            0x01 => Opcode::Register,
            0x81 => Opcode::RegisterEcho,
            0x02 => Opcode::HighVoltage,
            0x03 => Opcode::AcqParams,
            0x04 => Opcode::Reset,
            0x05 => Opcode::Focus,
            0x85 => Opcode::Fan,
            0x06 => Opcode::TriggerMask,
            0x07 => Opcode::PhBaseline,
            0x08 => Opcode::Shutter,
            0x09 => Opcode::LedFlasher,
            0x0a => Opcode::DataDestinations,
            0x0b => Opcode::HkDestination,
            0x0e => Opcode::GoeMask,
            other => return Err(QuaboError::command(format!("unknown opcode {other:#04x}"))),
        })
    }
}

/// A command ready to send. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandFrame {
    opcode: Opcode,
    bytes: Vec<u8>,
}

impl CommandFrame {
    /// Zeroed frame of the opcode's length with byte 0 set.
    pub(crate) fn new(opcode: Opcode) -> Self {
        let mut bytes = vec![0u8; opcode.frame_len()];
        bytes[0] = opcode.code();
        Self { opcode, bytes }
    }

    /// MAROC register command from four chip images.
    pub fn register(images: &RegisterImages, echo: bool) -> Self {
        let mut frame = Self::new(if echo { Opcode::RegisterEcho } else { Opcode::Register });
        for (image, &offset) in images.chips().iter().zip(CHIP_IMAGE_OFFSETS.iter()) {
            frame.bytes[offset..offset + CHIP_IMAGE_LEN].copy_from_slice(image.as_bytes());
        }
        frame
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the device answers this command.
    pub fn expects_reply(&self) -> bool {
        self.opcode.reply_len().is_some()
    }

    /// Compare an echoed register frame against this one.
    ///
    /// Bytes inside [`RESERVED_ECHO_RANGES`] are ignored. Reports the first
    /// differing byte.
    pub fn verify_echo(&self, reply: &[u8]) -> Result<()> {
        if reply.len() != self.bytes.len() {
            return Err(QuaboError::SizeMismatch { expected: self.bytes.len(), actual: reply.len() });
        }

        let reserved = |i: usize| RESERVED_ECHO_RANGES.iter().any(|r| r.contains(&i));
        match self
            .bytes
            .iter()
            .zip(reply)
            .enumerate()
            .find(|&(i, (sent, received))| sent != received && !reserved(i))
        {
            Some((offset, (&sent, &received))) => {
                Err(QuaboError::FrameVerificationMismatch { offset, sent, received })
            }
            None => Ok(()),
        }
    }

    fn put_u8(&mut self, offset: usize, value: u8) -> &mut Self {
        self.bytes[offset] = value;
        self
    }

    fn put_u16(&mut self, offset: usize, value: u16) -> &mut Self {
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    fn put_u32(&mut self, offset: usize, value: u32) -> &mut Self {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    fn put_ipv4(&mut self, offset: usize, addr: Ipv4Addr) -> &mut Self {
        self.bytes[offset..offset + 4].copy_from_slice(&addr.octets());
        self
    }
}

impl fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.bytes.iter().rposition(|&b| b != 0).map_or(1, |i| i + 1);
        f.debug_struct("CommandFrame")
            .field("opcode", &self.opcode)
            .field("len", &self.bytes.len())
            .field("bytes", &&self.bytes[..used])
            .finish()
    }
}

/// Parse a dotted-quad IPv4 address.
pub fn parse_ipv4(text: &str) -> Result<Ipv4Addr> {
    text.trim().parse().map_err(|_| QuaboError::command(format!("bad IP addr {}", text.trim())))
}

#[cfg(test)]
mod tests;
