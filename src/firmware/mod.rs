//! Flash access over the device's file transfer service
//!
//! The device exposes its configuration flash as remote files:
//!
//! - `/flash.<offset>` writes starting at a hex offset
//! - `/flash.<offset>.<length>` reads `length` bytes (hex) at `offset`
//! - `/flashuid` holds the 8-byte flash device ID
//! - `/progdev` reboots the FPGA from the 4-byte big-endian offset written to it
//!
//! [`FirmwareUploader`] checks every write against the fixed flash layout so
//! an oversized image cannot spill into the next region.

mod tftp;

pub use tftp::{BLOCK_SIZE, TFTP_PORT, TftpClient};

use std::fmt;
use std::net::IpAddr;
use tracing::{debug, info};

use crate::command::MacAddress;
use crate::{QuaboError, Result};

/// Bytes fetched per chunked read.
pub const READ_CHUNK: usize = 0x8000;

/// Boot offset the firmware expects in `/progdev`.
pub const DEFAULT_BOOT_OFFSET: u32 = 0x0001_0100;

/// Length of the flash device ID.
pub const FLASH_UID_LEN: usize = 8;

/// Remote file operations on the device flash.
#[async_trait::async_trait]
pub trait FlashTransport: Send + Sync {
    /// Read a whole remote file.
    async fn download(&self, remote: &str) -> Result<Vec<u8>>;

    /// Replace a remote file with `data`.
    async fn upload(&self, remote: &str, data: &[u8]) -> Result<()>;
}

/// Fixed regions of the configuration flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashRegion {
    /// Fallback FPGA image
    Golden,
    /// Normal FPGA image
    Silver,
    /// White Rabbit PTP core file system
    WrpcFilesys,
    /// MicroBlaze file
    MicroBlaze,
}

impl FlashRegion {
    pub const ALL: [FlashRegion; 4] = [
        FlashRegion::Golden,
        FlashRegion::Silver,
        FlashRegion::WrpcFilesys,
        FlashRegion::MicroBlaze,
    ];

    /// Start address in flash.
    pub const fn offset(self) -> u32 {
        match self {
            FlashRegion::Golden => 0x0000_0000,
            FlashRegion::Silver => 0x0101_0000,
            FlashRegion::WrpcFilesys => 0x00E0_0000,
            FlashRegion::MicroBlaze => 0x00F1_0000,
        }
    }

    /// Largest image the region holds; the silver image runs to the end of flash.
    pub const fn capacity(self) -> Option<usize> {
        match self {
            FlashRegion::Golden => Some(0x00E0_0000),
            FlashRegion::Silver => None,
            FlashRegion::WrpcFilesys => Some(0x11_0000),
            FlashRegion::MicroBlaze => Some(0x10_0000),
        }
    }

    /// Reject images the region cannot take. The WR-PC file system must
    /// fill its region exactly.
    pub fn check_size(self, len: usize) -> Result<()> {
        let fits = match (self, self.capacity()) {
            (FlashRegion::WrpcFilesys, Some(capacity)) => len == capacity,
            (_, Some(capacity)) => len <= capacity,
            (_, None) => true,
        };
        if fits {
            Ok(())
        } else {
            let capacity = self.capacity().unwrap_or(0);
            Err(QuaboError::transfer(
                write_path(self.offset()),
                format!("{len:#x} bytes do not fit the {self} region ({capacity:#x})"),
            ))
        }
    }
}

impl fmt::Display for FlashRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlashRegion::Golden => "golden firmware",
            FlashRegion::Silver => "silver firmware",
            FlashRegion::WrpcFilesys => "wrpc filesys",
            FlashRegion::MicroBlaze => "mb file",
        };
        f.write_str(name)
    }
}

/// Remote name for a write at `offset`.
pub fn write_path(offset: u32) -> String {
    format!("/flash.{offset:x}")
}

/// Remote name for a read of `len` bytes at `offset`.
pub fn read_path(offset: u32, len: usize) -> String {
    format!("/flash.{offset:x}.{len:x}")
}

/// Board MAC address derived from the flash device ID.
pub fn mac_from_flash_uid(uid: &[u8; FLASH_UID_LEN]) -> MacAddress {
    MacAddress([0x00, uid[5], uid[4], uid[3], uid[2], uid[1]])
}

/// Reads, writes and reboots the device flash.
pub struct FirmwareUploader<T = TftpClient> {
    transport: T,
}

impl FirmwareUploader<TftpClient> {
    /// Uploader talking TFTP to `ip`.
    pub fn tftp(ip: IpAddr) -> Self {
        info!("TFTP client created for {}", ip);
        Self::new(TftpClient::new(ip))
    }
}

impl<T: FlashTransport> FirmwareUploader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Flash device ID.
    pub async fn flash_uid(&self) -> Result<[u8; FLASH_UID_LEN]> {
        info!("Download flash Device ID from flash chip");
        let data = self.transport.download("/flashuid").await?;
        let uid: [u8; FLASH_UID_LEN] = data
            .get(..FLASH_UID_LEN)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                let details = format!("{} bytes, expected {}", data.len(), FLASH_UID_LEN);
                QuaboError::transfer("/flashuid", details)
            })?;
        debug!("Flash Device ID: {:02x?}", uid);
        Ok(uid)
    }

    /// Board MAC address, read through the flash ID.
    pub async fn mac_address(&self) -> Result<MacAddress> {
        self.flash_uid().await.map(|uid| mac_from_flash_uid(&uid))
    }

    /// Read `len` bytes of flash at `offset` in [`READ_CHUNK`] pieces.
    pub async fn read(&self, offset: u32, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            let chunk_len = READ_CHUNK.min(len - out.len());
            let address = u32::try_from(out.len())
                .ok()
                .and_then(|done| offset.checked_add(done))
                .ok_or_else(|| {
                    QuaboError::transfer(read_path(offset, len), "address past the end of flash")
                })?;
            let remote = read_path(address, chunk_len);
            let chunk = self.transport.download(&remote).await?;
            if chunk.len() != chunk_len {
                return Err(QuaboError::transfer(
                    remote,
                    format!("read {} bytes, expected {}", chunk.len(), chunk_len),
                ));
            }
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    /// Read back a whole region.
    pub async fn read_region(&self, region: FlashRegion) -> Result<Vec<u8>> {
        let len = region.capacity().ok_or_else(|| {
            let details = format!("{region} has no fixed size to read");
            QuaboError::transfer(write_path(region.offset()), details)
        })?;
        info!("Download {} from flash chip", region);
        let data = self.read(region.offset(), len).await?;
        info!("Download {} successfully", region);
        Ok(data)
    }

    /// Write an image into its region.
    pub async fn write_region(&self, region: FlashRegion, image: &[u8]) -> Result<()> {
        region.check_size(image.len())?;
        info!("Upload {} bytes to {} space", image.len(), region);
        self.transport.upload(&write_path(region.offset()), image).await?;
        info!("Upload to {} space successfully", region);
        Ok(())
    }

    /// Reboot the FPGA from [`DEFAULT_BOOT_OFFSET`].
    pub async fn reboot(&self) -> Result<()> {
        self.reboot_from(DEFAULT_BOOT_OFFSET).await
    }

    /// Reboot the FPGA from `offset`. The device goes down mid-transfer, so a
    /// timeout counts as success.
    pub async fn reboot_from(&self, offset: u32) -> Result<()> {
        info!("Rebooting FPGA from {:#010x}", offset);
        match self.transport.upload("/progdev", &offset.to_be_bytes()).await {
            Ok(()) | Err(QuaboError::Timeout { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
