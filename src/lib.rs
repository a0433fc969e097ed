//! Type-safe Rust library for controlling a Quabo detector module.
//!
//! Quabo talks to one networked detector board over UDP and uploads its
//! firmware over TFTP.
//!
//! # Features
//!
//! - **Command codec**: 64-byte command frames and the 492-byte MAROC register
//!   frame, with echo verification
//! - **Register builder**: bit-level packing of named MAROC fields into four
//!   per-chip serial register images
//! - **Telemetry decoding**: schema-driven decoding of housekeeping and science
//!   packets into named, scaled values
//! - **Streams**: decoded records as async streams with latest-wins throttling
//!
//! # Quick Start
//!
//! ## Example (housekeeping)
//!
//! ```rust,no_run
//! use quabo::{DeviceConfig, Quabo, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = DeviceConfig::new("192.168.3.248".parse()?);
//!     let connection = Quabo::housekeeping(&device).await?;
//!     let mut stream = connection.subscribe(UpdateRate::Max(1));
//!
//!     while let Some(record) = stream.next().await {
//!         println!("HV 0: {:?} V", record.get_f64("hvmon0"));
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Codecs
pub mod command;
pub mod decoder;
pub mod register;
pub mod schema;

// Configuration and logging
pub mod config;
pub mod logging;

// Stream-based telemetry architecture
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;
pub mod stream;
pub mod transport;

// Device control
pub mod control;
pub mod firmware;

// Core exports
pub use error::*;
pub use types::*;

pub use command::{CommandFrame, Opcode};
pub use config::{DeviceConfig, QuaboConfig};
pub use decoder::TelemetryDecoder;
pub use register::RegisterImages;
pub use schema::ScienceVariant;

// Main API exports
pub use connection::TelemetryConnection;
pub use control::QuaboControl;
pub use firmware::FirmwareUploader;

/// Unified entry point for Quabo connections.
///
/// Every connection is built from a [`DeviceConfig`] that names the board's
/// address. Command, housekeeping and science traffic use separate ports, so
/// all three can be open at once.
///
/// # Examples
///
/// ## Configure and start
/// ```rust,no_run
/// use quabo::{DeviceConfig, Quabo, QuaboConfig};
///
/// #[tokio::main]
/// async fn main() -> quabo::Result<()> {
///     let device = DeviceConfig::new("192.168.3.248".parse().unwrap());
///     let config = QuaboConfig::load("configs/quabo_config.yml")?;
///     let control = Quabo::control(&device, config).await?;
///     control.set_maroc_params(true).await?;
///     control.set_hv(true, 0b1111).await?;
///     Ok(())
/// }
/// ```
pub struct Quabo;

impl Quabo {
    /// Open the command channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the command port cannot be bound.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use quabo::{DeviceConfig, Quabo, QuaboConfig};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> quabo::Result<()> {
    /// let device = DeviceConfig::new("192.168.3.248".parse().unwrap());
    /// let control = Quabo::control(&device, QuaboConfig::default()).await?;
    /// control.reset().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn control(device: &DeviceConfig, config: QuaboConfig) -> Result<QuaboControl> {
        QuaboControl::connect(device, config).await
    }

    /// Listen for housekeeping packets.
    ///
    /// # Errors
    ///
    /// Returns an error if the housekeeping port cannot be bound.
    pub async fn housekeeping(device: &DeviceConfig) -> Result<TelemetryConnection> {
        TelemetryConnection::housekeeping(device).await
    }

    /// Listen for science packets of one acquisition mode.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use quabo::{DeviceConfig, Quabo, ScienceVariant};
    /// use std::time::Duration;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> quabo::Result<()> {
    /// let device = DeviceConfig::new("192.168.3.248".parse().unwrap());
    /// let science = Quabo::science(&device, ScienceVariant::Ph).await?;
    /// if let Some(record) = science.recv_one(Duration::from_secs(3)).await {
    ///     println!("packet {:?}", record.get("packet_no"));
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn science(
        device: &DeviceConfig,
        variant: ScienceVariant,
    ) -> Result<TelemetryConnection> {
        TelemetryConnection::science(device, variant).await
    }

    /// Flash access over TFTP, waiting up to the transfer timeout per block.
    pub fn firmware(device: &DeviceConfig) -> FirmwareUploader {
        let client = firmware::TftpClient::new(device.ip).with_timeout(device.timeouts.transfer());
        FirmwareUploader::new(client)
    }
}
