//! Benchmarks for telemetry decoding
//!
//! Measures schema-driven decoding of synthetic datagrams:
//! - 64-byte housekeeping packets (scaled fields, flags, reversed text)
//! - science packets for each acquisition mode
//! - sender check plus decode through `TelemetryDecoder`

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use quabo::decoder::decode;
use quabo::schema::{ScienceVariant, housekeeping, science};
use quabo::test_utils::{HousekeepingBuilder, science_packet};
use quabo::{RawPacket, TelemetryDecoder};
use std::hint::black_box;
use std::sync::Arc;
use std::time::SystemTime;

fn bench_housekeeping(c: &mut Criterion) {
    let schema = housekeeping().expect("housekeeping schema");
    let packet = HousekeepingBuilder::new()
        .boardloc(0xf80a)
        .hvmon(0, 1200)
        .uid(0x0123_4567_89ab_cdef)
        .fwver("v2.1")
        .status(0b11, 1)
        .build();

    let mut group = c.benchmark_group("housekeeping_decode");
    group.throughput(Throughput::Bytes(packet.len() as u64));
    group.bench_function("decode", |b| {
        b.iter(|| black_box(decode(&schema, black_box(&packet), SystemTime::UNIX_EPOCH)))
    });
    group.finish();
}

fn bench_science(c: &mut Criterion) {
    let mut group = c.benchmark_group("science_decode");

    for variant in [ScienceVariant::Ph, ScienceVariant::Movie16, ScienceVariant::Movie8] {
        let schema = science(variant).expect("science schema");
        let samples: Vec<i16> = (0..512).map(|i| (i * 3) as i16).collect();
        let packet = science_packet(variant, 42, 0xf80a, &samples);

        group.throughput(Throughput::Bytes(packet.len() as u64));
        group.bench_function(variant.to_string(), |b| {
            b.iter(|| black_box(decode(&schema, black_box(&packet), SystemTime::UNIX_EPOCH)))
        });
    }
    group.finish();
}

fn bench_decoder_with_sender_check(c: &mut Criterion) {
    let schema = Arc::new(housekeeping().expect("housekeeping schema"));
    let device = "192.168.3.248:60002".parse().expect("socket address");
    let decoder = TelemetryDecoder::new(schema).with_device("192.168.3.248".parse().expect("ip"));
    let packet = RawPacket::new(HousekeepingBuilder::new().hvmon(1, 500).build(), device);

    c.bench_function("decode_packet_checked_sender", |b| {
        b.iter(|| black_box(decoder.decode_packet(black_box(&packet))))
    });
}

criterion_group!(benches, bench_housekeeping, bench_science, bench_decoder_with_sender_check);
criterion_main!(benches);
