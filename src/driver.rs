//! Driver spawns and manages telemetry decoding tasks

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::decoder::TelemetryDecoder;
use crate::provider::PacketSource;
use crate::types::DecodedRecord;

/// Consecutive transport errors before the driver gives up.
pub const MAX_TRANSPORT_ERRORS: u32 = 10;

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Receiver for decoded records
    pub records: watch::Receiver<Option<Arc<DecodedRecord>>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Statistics kept by the reader task, logged when it ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DriverStats {
    pub decoded: u64,
    pub rejected: u64,
}

/// Driver spawns the receive-and-decode task
///
/// The task owns the [`PacketSource`], decodes every datagram with a
/// [`TelemetryDecoder`] and publishes the latest record. Packets that fail to
/// decode are logged and dropped; no record is ever published with
/// substituted values.
pub struct Driver;

impl Driver {
    /// Spawn the reader task for `source`.
    pub fn spawn<P>(source: P, decoder: TelemetryDecoder) -> DriverChannels
    where
        P: PacketSource,
    {
        let (record_tx, record_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_reader = cancel.clone();

        tokio::spawn(async move {
            Self::reader_task(source, decoder, record_tx, cancel_reader).await;
        });

        DriverChannels { records: record_rx, cancel }
    }

    async fn reader_task<P>(
        mut source: P,
        decoder: TelemetryDecoder,
        record_tx: watch::Sender<Option<Arc<DecodedRecord>>>,
        cancel: CancellationToken,
    ) where
        P: PacketSource,
    {
        let schema_name = decoder.schema().name.clone();
        info!("Reader task started for {}", schema_name);
        let mut stats = DriverStats::default();
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Reader for {} cancelled", schema_name);
                    break;
                }
                result = source.next_packet() => result,
            };

            match result {
                Ok(Some(packet)) => {
                    error_count = 0;
                    match decoder.decode_packet(&packet) {
                        Ok(record) => {
                            stats.decoded += 1;
                            trace!("Record {} from {}", stats.decoded, packet.source);
                            if record_tx.send(Some(Arc::new(record))).is_err() {
                                debug!("Record receiver dropped, shutting down");
                                break;
                            }
                        }
                        Err(e) => {
                            stats.rejected += 1;
                            warn!("Dropping {} packet from {}: {}", schema_name, packet.source, e);
                        }
                    }
                }
                Ok(None) => {
                    info!("Packet source for {} ended", schema_name);
                    let _ = record_tx.send(None);
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Transport error ({}/{}): {}", error_count, MAX_TRANSPORT_ERRORS, e);

                    if error_count >= MAX_TRANSPORT_ERRORS {
                        error!("Too many transport errors, stopping {} reader", schema_name);
                        let _ = record_tx.send(None);
                        break;
                    }

                    // 100ms, 200ms, 400ms, ... capped at 3.2s
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(6)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!(
            "Reader task for {} ended ({} decoded, {} rejected)",
            schema_name, stats.decoded, stats.rejected
        );
    }
}
