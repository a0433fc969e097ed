//! Telemetry connection for housekeeping and science streams

use futures::{Stream, StreamExt};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::DeviceConfig;
use crate::decoder::TelemetryDecoder;
use crate::driver::Driver;
use crate::provider::PacketSource;
use crate::providers::ChannelSource;
use crate::schema::{self, ScienceVariant};
use crate::stream::ThrottleExt;
use crate::transport::{DATA_PORT, HK_PORT, UdpChannel};
use crate::types::{DecodedRecord, PacketSchema, UpdateRate};
use crate::Result;

/// Decoded record stream from one device port
pub struct TelemetryConnection {
    /// Latest decoded record
    records: watch::Receiver<Option<Arc<DecodedRecord>>>,

    schema: Arc<PacketSchema>,

    /// Nominal packet rate, when the source knows it
    source_hz: Option<f64>,

    /// Cancellation token for stopping the reader
    cancel: CancellationToken,
}

impl TelemetryConnection {
    /// Listen for housekeeping packets from the device.
    pub async fn housekeeping(device: &DeviceConfig) -> Result<Self> {
        let channel =
            UdpChannel::bind(device.local_addr(HK_PORT), device.device_addr(HK_PORT)).await?;
        let source = ChannelSource::new(channel, Arc::new(schema::housekeeping()?))
            .with_poll(device.timeouts.telemetry());
        info!("Housekeeping connection to {}", device.ip);
        Ok(Self::from_source(source, Some(device.ip)))
    }

    /// Listen for science packets of one acquisition mode.
    pub async fn science(device: &DeviceConfig, variant: ScienceVariant) -> Result<Self> {
        let channel =
            UdpChannel::bind(device.local_addr(DATA_PORT), device.device_addr(DATA_PORT)).await?;
        let source = ChannelSource::new(channel, Arc::new(schema::science(variant)?))
            .with_poll(device.timeouts.telemetry());
        info!("Science ({}) connection to {}", variant, device.ip);
        Ok(Self::from_source(source, Some(device.ip)))
    }

    /// Decode datagrams from any source.
    ///
    /// With `device` set, datagrams from other senders are rejected.
    pub fn from_source<P: PacketSource>(source: P, device: Option<IpAddr>) -> Self {
        let schema = source.schema();
        let source_hz = source.packet_rate();

        let mut decoder = TelemetryDecoder::new(Arc::clone(&schema));
        if let Some(ip) = device {
            decoder = decoder.with_device(ip);
        }

        let channels = Driver::spawn(source, decoder);
        Self { records: channels.records, schema, source_hz, cancel: channels.cancel }
    }

    /// Subscribe to decoded records
    ///
    /// Waits for the first record, then yields records until the source ends.
    /// With [`UpdateRate::Max`] only the newest record per interval is yielded.
    pub fn subscribe(&self, rate: UpdateRate) -> impl Stream<Item = Arc<DecodedRecord>> + 'static {
        // WatchStream yields the current value first; leading None means
        // nothing has arrived yet, a later None means the source ended.
        let records = WatchStream::new(self.records.clone())
            .skip_while(|opt| {
                let is_none = opt.is_none();
                async move { is_none }
            })
            .take_while(|opt| {
                let is_some = opt.is_some();
                async move { is_some }
            })
            .filter_map(|opt| async move { opt });

        match rate.throttle_period(self.source_hz) {
            None => records.boxed(),
            Some(period) => records.throttle(period).boxed(),
        }
    }

    /// Most recent record, if any has arrived.
    pub fn latest(&self) -> Option<Arc<DecodedRecord>> {
        self.records.borrow().clone()
    }

    /// Wait up to `timeout` for a record newer than the current one.
    ///
    /// `None` when nothing arrives in time or the source has ended.
    pub async fn recv_one(&self, timeout: Duration) -> Option<Arc<DecodedRecord>> {
        let mut records = self.records.clone();
        records.mark_unchanged();
        match tokio::time::timeout(timeout, records.changed()).await {
            Ok(Ok(())) => records.borrow_and_update().clone(),
            Ok(Err(_)) => None,
            Err(_) => {
                debug!("No {} record within {:?}", self.schema.name, timeout);
                None
            }
        }
    }

    pub fn schema(&self) -> &PacketSchema {
        &self.schema
    }

    /// Nominal packet rate of the source
    pub fn source_hz(&self) -> Option<f64> {
        self.source_hz
    }
}

impl Drop for TelemetryConnection {
    fn drop(&mut self) {
        debug!("Dropping {} connection", self.schema.name);
        self.cancel.cancel();
    }
}
