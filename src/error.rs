//! Error types for the Quabo codec, command and transport layers.
//!
//! Every fallible operation in the crate returns [`QuaboError`]. The variants
//! follow the failure modes of the device protocol:
//!
//! ## Error Categories
//!
//! - **Decode Errors**: `TruncatedPacket`, `SizeMismatch`, `Decode`
//! - **Transport Errors**: `UnexpectedSender`, `Timeout`, `Io`
//! - **Command Errors**: `Arity`, `FrameVerificationMismatch`, `Command`
//! - **Setup Errors**: `Config`, `Schema`, `Transfer`
//!
//! `UnexpectedSender` and `Timeout` are normal outcomes on a telemetry
//! channel. The transport discards foreign datagrams and reports a quiet
//! deadline as `Ok(None)`. Callers see `Timeout` when a command reply does
//! not arrive (see [`crate::QuaboControl`]) and `UnexpectedSender` only from
//! [`crate::TelemetryDecoder::decode_packet`].
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use quabo::QuaboError;
//! use std::time::Duration;
//!
//! let error = QuaboError::timeout(Duration::from_secs(3));
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Quabo operations.
pub type Result<T, E = QuaboError> = std::result::Result<T, E>;

/// Main error type for Quabo operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum QuaboError {
    #[error("Truncated packet: field '{field}' needs {needed} bytes, buffer has {available}")]
    TruncatedPacket { field: String, needed: usize, available: usize },

    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Failed to decode field '{field}': {details}")]
    Decode { field: String, details: String },

    #[error("Datagram from unexpected sender {actual} (device is {expected})")]
    UnexpectedSender { expected: IpAddr, actual: IpAddr },

    #[error("Type conversion error: {details}")]
    TypeConversion { details: String },

    #[error("Field '{field}' needs {expected} values, got {actual}")]
    Arity { field: String, expected: usize, actual: usize },

    #[error(
        "Echoed register frame differs at byte {offset}: sent {sent:#04x}, received {received:#04x}"
    )]
    FrameVerificationMismatch { offset: usize, sent: u8, received: u8 },

    #[error("No datagram within {duration:?}")]
    Timeout { duration: Duration },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error in {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("Invalid command: {details}")]
    Command { details: String },

    #[error("Firmware transfer of '{remote}' failed: {details}")]
    Transfer { remote: String, details: String },

    #[error("Invalid packet schema: {details}")]
    Schema { details: String },
}

impl QuaboError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            QuaboError::Timeout { .. } => true,
            QuaboError::FrameVerificationMismatch { .. } => true,
            QuaboError::Io { .. } => true,
            QuaboError::Transfer { .. } => true,
            QuaboError::TruncatedPacket { .. } => false,
            QuaboError::SizeMismatch { .. } => false,
            QuaboError::Decode { .. } => false,
            QuaboError::TypeConversion { .. } => false,
            QuaboError::UnexpectedSender { .. } => false,
            QuaboError::Arity { .. } => false,
            QuaboError::Config { .. } => false,
            QuaboError::Command { .. } => false,
            QuaboError::Schema { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            QuaboError::TruncatedPacket { .. } => vec![
                "Check the receive buffer length matches the packet schema",
                "Verify the acquisition mode matches the science packet variant",
            ],
            QuaboError::SizeMismatch { .. } => vec![
                "Check the field length is a multiple of the primitive width",
                "Verify the packet schema definition",
            ],
            QuaboError::Decode { .. } => vec![
                "Verify the firmware revision matches the packet schema",
                "Check the protocol byte order",
            ],
            QuaboError::TypeConversion { .. } => vec![
                "Check the value type matches the field primitive type",
                "Use the primitive type reported by the schema",
            ],
            QuaboError::UnexpectedSender { .. } => vec![
                "Check the configured device IP address",
                "Make sure only one Quabo sends to this host port",
            ],
            QuaboError::Arity { .. } => vec![
                "Supply exactly one value per MAROC chip",
                "Check the configuration entry for missing commas",
            ],
            QuaboError::FrameVerificationMismatch { .. } => vec![
                "Resend the MAROC register command",
                "Check the network link to the device",
            ],
            QuaboError::Timeout { .. } => vec![
                "Increase the receive timeout",
                "Check the device destination IP configuration",
                "Verify the device is powered and reachable",
            ],
            QuaboError::Io { .. } => vec![
                "Check no other process is bound to the Quabo ports",
                "Verify network interface permissions",
            ],
            QuaboError::Config { .. } => vec![
                "Check the configuration file exists and is valid YAML",
                "Compare against the documented configuration sections",
            ],
            QuaboError::Command { .. } => vec![
                "Check the command arguments are within range",
                "Verify IP addresses are dotted-quad IPv4",
            ],
            QuaboError::Transfer { .. } => vec![
                "Retry the transfer",
                "Check the firmware image size for the flash region",
            ],
            QuaboError::Schema { .. } => vec![
                "Check field offsets and lengths fit inside the packet",
                "Verify bit fields are one byte wide",
            ],
        }
    }

    /// Helper constructor for truncated packets.
    pub fn truncated(field: impl Into<String>, needed: usize, available: usize) -> Self {
        QuaboError::TruncatedPacket { field: field.into(), needed, available }
    }

    /// Helper constructor for primitive decode failures.
    pub fn decode_failed(field: impl Into<String>, details: impl Into<String>) -> Self {
        QuaboError::Decode { field: field.into(), details: details.into() }
    }

    /// Helper constructor for receive deadlines.
    pub fn timeout(duration: Duration) -> Self {
        QuaboError::Timeout { duration }
    }

    /// Helper constructor for I/O errors with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        QuaboError::Io { context: context.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        QuaboError::Config { path: path.into(), details: details.into() }
    }

    /// Helper constructor for invalid command arguments or replies.
    pub fn command(details: impl Into<String>) -> Self {
        QuaboError::Command { details: details.into() }
    }

    /// Helper constructor for firmware transfer failures.
    pub fn transfer(remote: impl Into<String>, details: impl Into<String>) -> Self {
        QuaboError::Transfer { remote: remote.into(), details: details.into() }
    }

    /// Helper constructor for schema definition errors.
    pub fn schema(details: impl Into<String>) -> Self {
        QuaboError::Schema { details: details.into() }
    }
}

impl From<std::io::Error> for QuaboError {
    fn from(err: std::io::Error) -> Self {
        QuaboError::Io { context: "socket operation".to_string(), source: err }
    }
}
