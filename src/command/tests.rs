use super::*;
use crate::register::RegisterImages;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn sample_register_frame() -> CommandFrame {
    let images = RegisterImages::from_settings([
        ("OTABG_ON", [1u32, 1, 1, 1]),
        ("DAC1", [0x1a0, 0x1b0, 0x1c0, 0x1d0]),
        ("GAIN7", [16, 32, 64, 128]),
        ("CTEST_63", [1, 0, 0, 1]),
    ])
    .unwrap();
    CommandFrame::register(&images, true)
}

#[test]
fn register_frame_layout() {
    let images =
        RegisterImages::from_settings([("OTABG_ON", [1u32, 0, 1, 0]), ("CMD_FSU", [0, 1, 0, 1])])
            .unwrap();
    let frame = CommandFrame::register(&images, false);

    assert_eq!(frame.len(), REGISTER_FRAME_LEN);
    assert_eq!(frame.as_bytes()[0], 0x01);
    assert_eq!(&frame.as_bytes()[1..4], &[0, 0, 0]);
    for (chip, &offset) in CHIP_IMAGE_OFFSETS.iter().enumerate() {
        assert_eq!(&frame.as_bytes()[offset..offset + 104], images.chip(chip).unwrap().as_bytes());
    }
    // OTABG_ON is bit 0; CMD_FSU is bit 188 = byte 23 bit 4
    assert_eq!(frame.as_bytes()[4], 1);
    assert_eq!(frame.as_bytes()[132], 0);
    assert_eq!(frame.as_bytes()[132 + 23], 0x10);
    assert!(RESERVED_ECHO_RANGES.iter().all(|r| frame.as_bytes()[r.clone()].iter().all(|&b| b == 0)));

    let echo = CommandFrame::register(&images, true);
    assert_eq!(echo.opcode(), Opcode::RegisterEcho);
    assert_eq!(echo.as_bytes()[0], 0x81);
    assert!(echo.expects_reply());
    assert!(!frame.expects_reply());
}

#[test]
fn echo_differing_only_in_reserved_ranges_verifies() {
    let frame = sample_register_frame();
    let mut reply = frame.as_bytes().to_vec();
    for range in RESERVED_ECHO_RANGES {
        for byte in &mut reply[range] {
            *byte = 0xee;
        }
    }
    assert!(frame.verify_echo(&reply).is_ok());
}

#[test]
fn echo_differing_outside_reserved_ranges_fails() {
    let frame = sample_register_frame();
    for offset in [0, 2, 107, 132, 259 + 1, 491] {
        let mut reply = frame.as_bytes().to_vec();
        reply[offset] ^= 0x5a;
        match frame.verify_echo(&reply) {
            Err(QuaboError::FrameVerificationMismatch { offset: at, sent, received }) => {
                assert_eq!(at, offset);
                assert_eq!(sent ^ received, 0x5a);
            }
            other => panic!("offset {offset}: expected mismatch, got {other:?}"),
        }
    }
}

#[test]
fn echo_of_wrong_length_fails() {
    let frame = sample_register_frame();
    let err = frame.verify_echo(&frame.as_bytes()[..400]).unwrap_err();
    assert!(matches!(err, QuaboError::SizeMismatch { expected: 492, actual: 400 }));
}

#[test]
fn high_voltage_respects_channel_mask() {
    let frame = CommandFrame::high_voltage([0x1234, 0x5678, 0x9abc, 0xdef0], 0b0101, true);
    assert_eq!(frame.len(), COMMAND_FRAME_LEN);
    assert_eq!(&frame.as_bytes()[..10], &[0x02, 0, 0x34, 0x12, 0, 0, 0xbc, 0x9a, 0, 0]);

    let off = CommandFrame::high_voltage([0x1234; 4], 0b1111, false);
    assert!(off.as_bytes()[1..].iter().all(|&b| b == 0));
}

#[test]
fn acq_params_layout_and_masks() {
    let params = AcqParams {
        acq_mode: 0x0102,
        acq_int: 1000,
        hold1: 15,
        hold2: 3,
        adc_clk_ph: 2,
        mon_chan: 0x0203,
        stim_on: 0xff,
        stim_level: 200,
        stim_rate: 0xff,
        flash_rate: 0x0f,
        flash_level: 0xff,
        flash_width: 0xff,
    };
    let bytes = CommandFrame::acq_params(&params).as_bytes().to_vec();
    assert_eq!(bytes[0], 0x03);
    assert_eq!(&bytes[2..14], &[0x02, 0x01, 0xe8, 0x03, 15, 0, 3, 0, 2, 0, 0x03, 0x02]);
    assert_eq!(bytes[14], 0x01);
    assert_eq!(bytes[16], 200);
    assert_eq!(bytes[18], 0x07);
    assert_eq!(bytes[20], 0);
    assert_eq!(bytes[22], 0x07);
    assert_eq!(bytes[24], 0x1f);
    assert_eq!(bytes[26], 0x0f);
    assert!(bytes[27..].iter().all(|&b| b == 0));
}

#[test]
fn daq_params_mode_bits() {
    let params = DaqParams {
        image: true,
        image_8bit: true,
        pulse_height: true,
        baseline_subtract: false,
        image_us: 500,
        stim: Some(StimParams { rate: 3, level: 40 }),
        flash: Some(FlashParams { rate: 2, level: 10, width: 4 }),
    };
    let bytes = CommandFrame::daq_params(&params).as_bytes().to_vec();
    assert_eq!(bytes[2], 0x17);
    assert_eq!(&bytes[4..6], &500u16.to_le_bytes());
    assert_eq!(bytes[12], 69);
    assert_eq!((bytes[14], bytes[16], bytes[18]), (1, 40, 3));
    assert_eq!((bytes[22], bytes[24], bytes[26]), (2, 10, 4));

    let plain = CommandFrame::daq_params(&DaqParams { pulse_height: true, ..DaqParams::default() });
    assert_eq!(plain.as_bytes()[2], 0x01);
    assert_eq!(plain.as_bytes()[14], 0);
    assert_eq!(plain.as_bytes()[22], 0);
}

#[test]
fn focus_shutter_and_fan() {
    let shutter = ShutterState { open: true, power: true };
    let focus = CommandFrame::focus(1234, shutter, 7);
    let b = focus.as_bytes();
    assert_eq!(b[0], 0x05);
    assert_eq!(&b[4..6], &1234u16.to_le_bytes());
    assert_eq!((b[6], b[8]), (0b11, 7));
    assert_eq!(&b[10..18], &[0x2c, 0x01, 0xc8, 0x00, 0x10, 0x27, 0x10, 0x27]);

    let legacy = CommandFrame::shutter_legacy(ShutterState { open: false, power: true }, 3);
    assert_eq!((legacy.as_bytes()[0], legacy.as_bytes()[6], legacy.as_bytes()[8]), (0x05, 0b10, 3));
    assert_eq!(&legacy.as_bytes()[10..12], &[0, 0]);

    let fan = CommandFrame::fan(ShutterState::default(), 15).unwrap();
    assert_eq!((fan.as_bytes()[0], fan.as_bytes()[8]), (0x85, 15));
    assert!(matches!(CommandFrame::fan(ShutterState::default(), 16), Err(QuaboError::Command { .. })));
}

#[test]
fn trigger_and_goe_masks() {
    let masks = BTreeMap::from([(0, 0xdead_beef), (2, 0x0000_0001), (14, u32::MAX)]);
    let frame = CommandFrame::trigger_mask(&masks).unwrap();
    let b = frame.as_bytes();
    assert_eq!(b[0], 0x06);
    assert_eq!(&b[4..8], &[0xef, 0xbe, 0xad, 0xde]);
    assert_eq!(&b[8..12], &[0, 0, 0, 0]);
    assert_eq!(&b[12..16], &[1, 0, 0, 0]);
    assert_eq!(&b[60..64], &[0xff; 4]);

    let too_far = BTreeMap::from([(15, 1)]);
    assert!(CommandFrame::trigger_mask(&too_far).is_err());

    let goe = CommandFrame::goe_mask(0xff);
    assert_eq!((goe.as_bytes()[0], goe.as_bytes()[4]), (0x0e, 0x03));
}

#[test]
fn one_byte_switches() {
    assert_eq!(&CommandFrame::shutter(true).as_bytes()[..2], &[0x08, 1]);
    assert_eq!(&CommandFrame::shutter(false).as_bytes()[..2], &[0x08, 0]);
    assert_eq!(&CommandFrame::led_flasher(true).as_bytes()[..2], &[0x09, 1]);
    assert_eq!(CommandFrame::reset().as_bytes()[0], 0x04);
    assert_eq!(CommandFrame::ph_baseline().opcode().reply_len(), Some(516));
}

#[test]
fn destination_commands_carry_octets() {
    let ph = parse_ipv4("10.0.0.5").unwrap();
    let movie = parse_ipv4(" 192.168.1.100 ").unwrap();
    let frame = CommandFrame::data_destinations(ph, movie);
    assert_eq!(&frame.as_bytes()[..9], &[0x0a, 10, 0, 0, 5, 192, 168, 1, 100]);
    assert!(frame.expects_reply());

    let hk = CommandFrame::hk_destination(ph);
    assert_eq!(&hk.as_bytes()[..5], &[0x0b, 10, 0, 0, 5]);

    assert!(matches!(parse_ipv4("1.2.3"), Err(QuaboError::Command { .. })));
    assert!(parse_ipv4("256.1.1.1").is_err());
}

#[test]
fn reply_parsers() {
    let reply: Vec<u8> = (0u8..12).collect();
    let (ph, movie) = parse_destination_reply(&reply).unwrap();
    assert_eq!(ph.to_string(), "00:01:02:03:04:05");
    assert_eq!(movie.to_string(), "06:07:08:09:0a:0b");
    assert!(parse_destination_reply(&reply[..11]).is_err());

    let mut baseline = vec![0u8; 4 + 512];
    baseline[4..6].copy_from_slice(&0x0123u16.to_le_bytes());
    baseline[514..516].copy_from_slice(&0xfeffu16.to_le_bytes());
    let values = parse_ph_baseline(&baseline).unwrap();
    assert_eq!(values.len(), PH_BASELINE_VALUES);
    assert_eq!((values[0], values[255]), (0x0123, 0xfeff));
    assert!(parse_ph_baseline(&baseline[..100]).is_err());
}

#[test]
fn opcode_roundtrip_and_units() {
    for code in [0x01, 0x81, 0x02, 0x03, 0x04, 0x05, 0x85, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0e] {
        assert_eq!(Opcode::try_from(code).unwrap().code(), code);
    }
    assert!(Opcode::try_from(0x42).is_err());

    assert!((units::hv_volts(1000) - -1.14).abs() < 1e-12);
    assert!((units::stim_rate_hz(0).unwrap() - 100e6 / 19.0).abs() < 1e-6);
    assert_eq!(units::flash_rate_hz(7), Some(6104));
    assert_eq!(units::flash_rate_hz(8), None);
}

proptest! {
    #[test]
    fn prop_echo_verification_ignores_only_reserved_bytes(
        offset in 0..REGISTER_FRAME_LEN,
        flip in 1u8..=255,
    ) {
        let frame = sample_register_frame();
        let mut reply = frame.as_bytes().to_vec();
        reply[offset] ^= flip;

        let reserved = RESERVED_ECHO_RANGES.iter().any(|r| r.contains(&offset));
        let result = frame.verify_echo(&reply);
        if reserved {
            prop_assert!(result.is_ok());
        } else {
            let is_mismatch_at_offset = matches!(
                result,
                Err(QuaboError::FrameVerificationMismatch { offset: at, .. }) if at == offset
            );
            prop_assert!(is_mismatch_at_offset);
        }
    }
}
