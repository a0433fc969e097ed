use super::*;
use proptest::prelude::*;

fn zero_except(image: &ChipRegisterImage, lsb_pos: usize, width: u8) -> bool {
    (0..SERIAL_COMMAND_BITS)
        .filter(|&pos| pos < lsb_pos || pos >= lsb_pos + usize::from(width))
        .all(|pos| image.get_bits(pos, 1) == 0)
}

#[test]
fn single_bit_lands_in_expected_byte() {
    let mut image = ChipRegisterImage::default();
    assert_eq!(image.set_bits(155, 1, 1), SetBits::Applied);
    assert_eq!(image.as_bytes()[19], 0b0000_1000);
    assert!(zero_except(&image, 155, 1));
}

#[test]
fn field_spanning_three_bytes() {
    let mut image = ChipRegisterImage::default();
    assert_eq!(image.set_bits(7, 16, 0xffff), SetBits::Applied);
    assert_eq!(&image.as_bytes()[0..3], &[0x80, 0xff, 0x7f]);
    assert_eq!(image.get_bits(7, 16), 0xffff);
}

#[test]
fn wide_reads_are_clamped() {
    let mut image = ChipRegisterImage::default();
    image.set_bits(0, 16, 0xffff);
    image.set_bits(16, 16, 0xffff);
    assert_eq!(image.get_bits(0, 33), 0xffff);
    assert_eq!(image.get_bits(0, u8::MAX), 0xffff);
    assert_eq!(image.get_bits(830, 8), 0);
}

#[test]
fn last_bit_of_serial_command_is_writable() {
    let mut image = ChipRegisterImage::default();
    assert_eq!(image.set_bits(828, 1, 1), SetBits::Applied);
    assert_eq!(image.as_bytes()[103], 0b0001_0000);
}

#[test]
fn out_of_range_writes_are_skipped() {
    let mut images = RegisterImages::new();
    assert_eq!(images.set_bits(0, 829, 1, 1), SetBits::Skipped);
    assert_eq!(images.set_bits(0, 820, 10, 0x3ff), SetBits::Skipped);
    assert_eq!(images.set_bits(1, 0, 17, 1), SetBits::Skipped);
    assert_eq!(images.set_bits(4, 0, 1, 1), SetBits::Skipped);
    assert_eq!(images, RegisterImages::new());
}

#[test]
fn value_is_masked_to_field_width() {
    let mut image = ChipRegisterImage::default();
    let _ = image.set_bits(4, 2, 0xff);
    assert_eq!(image.as_bytes()[0], 0b0011_0000);
}

#[test]
fn rewrite_clears_previous_value() {
    let mut image = ChipRegisterImage::default();
    let _ = image.set_bits(13, 10, 0x3ff);
    let _ = image.set_bits(13, 10, 0x001);
    assert_eq!(image.get_bits(13, 10), 0x001);
    assert!(zero_except(&image, 13, 1));
}

#[test]
fn set_bits_4_requires_four_values() {
    let mut images = RegisterImages::new();
    let err = images.set_bits_4("DAC1", &[1, 2, 3], 13, 10).unwrap_err();
    assert!(matches!(
        err,
        QuaboError::Arity { ref field, expected: 4, actual: 3 } if field == "DAC1"
    ));
    assert_eq!(images, RegisterImages::new());

    let outcome = images.set_bits_4("DAC1", &[1, 2, 3, 4], 13, 10).unwrap();
    assert_eq!(outcome, SetBits::Applied);
    for chip in 0..CHIP_COUNT {
        assert_eq!(images.chip(chip).unwrap().get_bits(13, 10), chip as u32 + 1);
    }
}

#[test]
fn reverse_bits_examples() {
    assert_eq!(reverse_bits(0b0000000001, 10), 0b1000000000);
    assert_eq!(reverse_bits(0b1101, 4), 0b1011);
    assert_eq!(reverse_bits(0x01, 8), 0x80);
    assert_eq!(reverse_bits(0xff, 0), 0);
}

#[test]
fn lookup_static_and_channel_fields() {
    assert_eq!(lookup("DAC1"), Some(FieldLayout { position: 13, width: 10, reversed: true }));
    assert_eq!(lookup("CMD_FSU"), Some(FieldLayout { position: 188, width: 1, reversed: false }));
    assert_eq!(lookup("SW_FSB1_50k").map(|l| l.position), Some(170));
    assert_eq!(lookup("MASKOR1_0").map(|l| l.position), Some(154));
    assert_eq!(lookup("MASKOR2_63").map(|l| l.position), Some(153 - 126));
    assert_eq!(lookup("CTEST_5").map(|l| l.position), Some(823));
    assert_eq!(lookup("GAIN63"), Some(FieldLayout { position: 757 - 567, width: 8, reversed: true }));
    assert_eq!(lookup("GAIN64"), None);
    assert_eq!(lookup("CTEST_x"), None);
    assert_eq!(lookup("NOT_A_FIELD"), None);
}

#[test]
fn channel_families_do_not_overlap() {
    let mut owner = vec![None; SERIAL_COMMAND_BITS];
    let static_fields = MAROC_FIELDS.iter().map(|(name, layout)| (name.to_string(), *layout));
    let channel_fields = ChannelFamily::ALL
        .into_iter()
        .flat_map(|family| (0..CHANNELS).map(move |ch| (family.tag(ch), family.layout(ch))));

    for (tag, layout) in static_fields.chain(channel_fields) {
        for bit in usize::from(layout.position)..usize::from(layout.position) + usize::from(layout.width) {
            assert!(owner[bit].is_none(), "{tag} overlaps {:?} at bit {bit}", owner[bit]);
            owner[bit] = Some(tag.clone());
        }
    }
}

#[test]
fn gain_values_are_reversed_before_packing() {
    let mut images = RegisterImages::new();
    let outcome = images.apply("GAIN0", &[0x01, 0x80, 0x0f, 0xf0]).unwrap();
    assert_eq!(outcome, Some(SetBits::Applied));
    assert_eq!(images.chip(0).unwrap().get_bits(757, 8), 0x80);
    assert_eq!(images.chip(1).unwrap().get_bits(757, 8), 0x01);
    assert_eq!(images.chip(2).unwrap().get_bits(757, 8), 0xf0);
    assert_eq!(images.chip(3).unwrap().get_bits(757, 8), 0x0f);
}

#[test]
fn from_settings_ignores_unknown_tags_and_order() {
    let forward = RegisterImages::from_settings([
        ("DAC1", vec![0x1a0u32, 0x1a0, 0x1a0, 0x1a0]),
        ("GAIN12", vec![16, 17, 18, 19]),
        ("UNKNOWN", vec![1, 1, 1, 1]),
        ("MASKOR1_3", vec![1u32, 0, 1, 0]),
    ])
    .unwrap();
    let backward = RegisterImages::from_settings([
        ("MASKOR1_3", vec![1u32, 0, 1, 0]),
        ("GAIN12", vec![16, 17, 18, 19]),
        ("DAC1", vec![0x1a0u32, 0x1a0, 0x1a0, 0x1a0]),
    ])
    .unwrap();
    assert_eq!(forward, backward);
    assert_eq!(forward.chip(0).unwrap().get_bits(13, 10), reverse_bits(0x1a0, 10));
}

#[test]
fn from_settings_propagates_arity_errors() {
    let err = RegisterImages::from_settings([("DAC2", vec![1u32, 2])]).unwrap_err();
    assert!(matches!(err, QuaboError::Arity { actual: 2, .. }));
}

fn arb_field() -> impl Strategy<Value = (usize, u8)> {
    (1u8..=MAX_FIELD_WIDTH).prop_flat_map(|width| {
        (0..=SERIAL_COMMAND_BITS - usize::from(width)).prop_map(move |pos| (pos, width))
    })
}

proptest! {
    #[test]
    fn prop_readback_and_untouched_neighbours(
        chip in 0..CHIP_COUNT,
        (pos, width) in arb_field(),
        raw in any::<u32>(),
        seed in prop::collection::vec(any::<u8>(), CHIP_IMAGE_LEN),
    ) {
        let value = raw & ((1u32 << width) - 1);
        let mut images = RegisterImages::new();
        for (i, byte) in seed.iter().enumerate() {
            for bit in 0..8 {
                let _ = images.set_bits(chip, i * 8 + bit, 1, u32::from((byte >> bit) & 1));
            }
        }
        let before = *images.chip(chip).unwrap();

        prop_assert_eq!(images.set_bits(chip, pos, width, value), SetBits::Applied);
        let after = images.chip(chip).unwrap();
        prop_assert_eq!(after.get_bits(pos, width), value);
        for bit in (0..SERIAL_COMMAND_BITS).filter(|&b| b < pos || b >= pos + usize::from(width)) {
            prop_assert_eq!(after.get_bits(bit, 1), before.get_bits(bit, 1));
        }
        for other in (0..CHIP_COUNT).filter(|&c| c != chip) {
            prop_assert_eq!(images.chip(other).unwrap(), &ChipRegisterImage::default());
        }
    }

    #[test]
    fn prop_disjoint_writes_commute(
        (pos_a, width_a) in arb_field(),
        (pos_b, width_b) in arb_field(),
        a in any::<u32>(),
        b in any::<u32>(),
    ) {
        let end_a = pos_a + usize::from(width_a);
        let end_b = pos_b + usize::from(width_b);
        prop_assume!(end_a <= pos_b || end_b <= pos_a);

        let mut ab = ChipRegisterImage::default();
        let _ = ab.set_bits(pos_a, width_a, a);
        let _ = ab.set_bits(pos_b, width_b, b);

        let mut ba = ChipRegisterImage::default();
        let _ = ba.set_bits(pos_b, width_b, b);
        let _ = ba.set_bits(pos_a, width_a, a);

        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn prop_rewrite_is_idempotent((pos, width) in arb_field(), value in any::<u32>()) {
        let mut once = ChipRegisterImage::default();
        let _ = once.set_bits(pos, width, value);
        let mut twice = once;
        let _ = twice.set_bits(pos, width, value);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_reverse_bits_is_self_inverse(width in 1u8..=16, raw in any::<u32>()) {
        let value = raw & ((1u32 << width) - 1);
        let reversed = reverse_bits(value, width);
        prop_assert!(reversed < (1u32 << width));
        prop_assert_eq!(reverse_bits(reversed, width), value);
    }
}
