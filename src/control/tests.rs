use super::*;
use crate::command::{CHIP_IMAGE_OFFSETS, RESERVED_ECHO_RANGES};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

type Responder = Box<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

/// In-memory device: records sent frames and queues the responder's replies.
#[derive(Clone)]
struct MockChannel {
    state: Arc<MockState>,
}

struct MockState {
    sent: Mutex<Vec<Vec<u8>>>,
    queued: Mutex<VecDeque<Vec<u8>>>,
    responder: Responder,
}

impl MockChannel {
    fn new(responder: impl Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(MockState {
                sent: Mutex::default(),
                queued: Mutex::default(),
                responder: Box::new(responder),
            }),
        }
    }

    fn silent() -> Self {
        Self::new(|_| None)
    }

    fn sent(&self) -> Vec<Vec<u8>> {
        self.state.sent.lock().unwrap().clone()
    }

    fn queue(&self, datagram: Vec<u8>) {
        self.state.queued.lock().unwrap().push_back(datagram);
    }
}

#[async_trait::async_trait]
impl Channel for MockChannel {
    async fn send(&self, bytes: &[u8]) -> Result<()> {
        self.state.sent.lock().unwrap().push(bytes.to_vec());
        if let Some(reply) = (self.state.responder)(bytes) {
            self.queue(reply);
        }
        Ok(())
    }

    async fn receive(&self, max_len: usize, _timeout: Duration) -> Result<Option<RawPacket>> {
        let source: SocketAddr = "192.168.3.4:60000".parse().unwrap();
        Ok(self.state.queued.lock().unwrap().pop_front().map(|mut data| {
            data.truncate(max_len);
            RawPacket::new(data, source)
        }))
    }
}

fn config() -> QuaboConfig {
    QuaboConfig::from_yaml_str(
        r#"
dest_ips:
  PH: 10.0.0.5
  MOVIE: 10.0.0.6
  HK: 10.0.0.7
maroc:
  DAC1: "0x1a0,0x1b0,0x1c0,0x1d0"
  GAIN3: [16, 32, 64, 128]
hv:
  HV_0: 0x1234
  HV_1: 0x5678
chanmask:
  CHANMASK_1: 0xff
  GOEMASK: 3
"#,
    )
    .unwrap()
}

fn control(channel: &MockChannel) -> QuaboControl<MockChannel> {
    QuaboControl::new(channel.clone(), config(), Timeouts::default())
}

#[tokio::test]
async fn maroc_echo_with_rewritten_reserved_bytes_succeeds() {
    let channel = MockChannel::new(|frame| {
        let mut echo = frame.to_vec();
        for range in RESERVED_ECHO_RANGES {
            echo[range].fill(0x5a);
        }
        Some(echo)
    });
    control(&channel).set_maroc_params(true).await.unwrap();

    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), REGISTER_FRAME_LEN);
    assert_eq!(sent[0][0], 0x81);

    let images = config().register_images().unwrap();
    let offset = CHIP_IMAGE_OFFSETS[2];
    assert_eq!(&sent[0][offset..offset + 104], images.chip(2).unwrap().as_bytes());
}

#[tokio::test]
async fn maroc_echo_mismatch_is_reported() {
    let channel = MockChannel::new(|frame| {
        let mut echo = frame.to_vec();
        echo[10] ^= 0x01;
        Some(echo)
    });
    let err = control(&channel).set_maroc_params(true).await.unwrap_err();
    assert!(matches!(err, QuaboError::FrameVerificationMismatch { offset: 10, .. }));
}

#[tokio::test]
async fn maroc_echo_timeout() {
    let channel = MockChannel::silent();
    let err = control(&channel).set_maroc_params(true).await.unwrap_err();
    assert!(matches!(err, QuaboError::Timeout { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn maroc_without_echo_does_not_wait() {
    let channel = MockChannel::silent();
    control(&channel).set_maroc_params(false).await.unwrap();
    assert_eq!(channel.sent()[0][0], 0x01);
}

#[tokio::test(start_paused = true)]
async fn stale_replies_are_flushed_before_reply_commands() {
    let mut reply = vec![0u8; 4 + 512];
    reply[4..6].copy_from_slice(&700u16.to_le_bytes());
    let channel = MockChannel::new(move |frame| (frame[0] == 0x07).then(|| reply.clone()));
    channel.queue(vec![0xee; 12]);
    channel.queue(vec![0xee; 516]);

    let baselines = control(&channel).cal_ph_baseline().await.unwrap();
    assert_eq!(baselines.len(), 256);
    assert_eq!(baselines[0], 700);
}

#[tokio::test]
async fn hv_uses_configured_values() {
    let channel = MockChannel::silent();
    let control = control(&channel);
    control.set_hv(true, 0b0001).await.unwrap();
    control.set_hv(false, 0b1111).await.unwrap();

    let sent = channel.sent();
    assert_eq!(&sent[0][..6], &[0x02, 0, 0x34, 0x12, 0, 0]);
    assert!(sent[1][1..].iter().all(|&b| b == 0));
}

#[tokio::test(start_paused = true)]
async fn legacy_shutter_powers_then_releases() {
    let channel = MockChannel::silent();
    let mut control = control(&channel);
    control.set_fan(5).await.unwrap();

    let start = tokio::time::Instant::now();
    control.set_shutter_legacy(false).await.unwrap();
    assert!(start.elapsed() >= SHUTTER_SETTLE);

    let sent = channel.sent();
    let (open, release) = (&sent[1], &sent[2]);
    assert_eq!((open[0], open[6], open[8]), (0x05, 0b11, 5));
    assert_eq!((release[0], release[6], release[8]), (0x05, 0b00, 5));
    assert_eq!(control.shutter_state(), ShutterState::default());
}

#[tokio::test(start_paused = true)]
async fn fan_speed_feeds_focus_and_rejects_out_of_range() {
    let channel = MockChannel::silent();
    let mut control = control(&channel);
    control.set_fan(9).await.unwrap();
    assert!(control.set_fan(16).await.is_err());
    assert_eq!(control.fan_speed(), 9);

    control.set_focus(1000).await.unwrap();
    let sent = channel.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!((sent[0][0], sent[0][8]), (0x85, 9));
    assert_eq!(sent[1][8], 9);
    assert_eq!(&sent[1][4..6], &1000u16.to_le_bytes());
}

#[tokio::test]
async fn data_destinations_return_macs() {
    let channel = MockChannel::new(|frame| (frame[0] == 0x0a).then(|| (1u8..=12).collect()));
    let destinations = control(&channel).set_data_destinations().await.unwrap();

    assert_eq!(destinations.ph.to_string(), "01:02:03:04:05:06");
    assert_eq!(destinations.movie.to_string(), "07:08:09:0a:0b:0c");
    assert_eq!(&channel.sent()[0][..9], &[0x0a, 10, 0, 0, 5, 10, 0, 0, 6]);
}

#[tokio::test]
async fn short_destination_reply_is_an_error() {
    let channel = MockChannel::new(|_| Some(vec![0; 6]));
    let err = control(&channel).set_data_destinations().await.unwrap_err();
    assert!(matches!(err, QuaboError::Command { .. }));
}

#[tokio::test]
async fn missing_destination_is_an_error() {
    let channel = MockChannel::silent();
    let mut control =
        QuaboControl::new(channel.clone(), QuaboConfig::default(), Timeouts::default());
    assert!(control.set_hk_destination().await.is_err());
    assert!(channel.sent().is_empty());

    control.config_mut().set_dest(DestKind::Housekeeping, "10.9.8.7");
    control.set_hk_destination().await.unwrap();
    assert_eq!(&channel.sent()[0][..5], &[0x0b, 10, 9, 8, 7]);
}

#[tokio::test]
async fn masks_and_switches() {
    let channel = MockChannel::silent();
    let control = control(&channel);
    control.set_trigger_mask().await.unwrap();
    control.set_goe_mask().await.unwrap();
    control.set_shutter(true).await.unwrap();
    control.set_led_flasher(true).await.unwrap();
    control.reset().await.unwrap();
    control.set_acq_params().await.unwrap();
    let daq = DaqParams { pulse_height: true, ..DaqParams::default() };
    control.set_daq_params(&daq).await.unwrap();

    let opcodes: Vec<u8> = channel.sent().iter().map(|f| f[0]).collect();
    assert_eq!(opcodes, [0x06, 0x0e, 0x08, 0x09, 0x04, 0x03, 0x03]);
    let sent = channel.sent();
    assert_eq!(&sent[0][8..12], &[0xff, 0, 0, 0]);
    assert_eq!(sent[1][4], 3);
}

#[tokio::test]
async fn resolve_accepts_dotted_quads() {
    assert_eq!(resolve_ipv4(" 10.1.2.3").await.unwrap(), Ipv4Addr::new(10, 1, 2, 3));
}
