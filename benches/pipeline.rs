//! Benchmarks for the target resolution and decoding pipeline.
//!
//! Feeds a mixed stream of discovery events through `HeartRateMonitor`, the
//! same way a scan window would.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use vantage_hr_listener::{
    AdvertisementField, DiscoveryEvent, HeartRateMonitor, MacAddress, decode_heart_rate,
};

const WATCH: MacAddress = MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

fn heart_rate_event(bpm: u8) -> DiscoveryEvent {
    DiscoveryEvent::new(
        WATCH,
        vec![AdvertisementField::manufacturer(
            0x006B,
            &[0x72, 0x08, 0x72, 0xac, 0xf5, 0x02, 0x00, 0x00, 0x00, 0x00, 0x17, 0x00, bpm],
        )],
    )
}

/// One name advertisement from the watch, then `n` events where every fourth
/// comes from the watch and the rest from unrelated devices.
fn event_stream(n: usize) -> Vec<DiscoveryEvent> {
    let mut events = vec![DiscoveryEvent::new(
        WATCH,
        vec![AdvertisementField::local_name("Polar Vantage M")],
    )];
    events.extend((0..n).map(|i| {
        if i % 4 == 0 {
            heart_rate_event(60 + (i % 100) as u8)
        } else {
            DiscoveryEvent::new(
                MacAddress([0x10, 0x20, 0x30, 0x40, 0x50, i as u8]),
                vec![
                    AdvertisementField::local_name("Some Tag"),
                    AdvertisementField::manufacturer(0x0499, &[0x05, 0x12, 0xFC, 0x53, 0x94]),
                ],
            )
        }
    }));
    events
}

fn bench_decode(c: &mut Criterion) {
    c.bench_function("decode_heart_rate", |b| {
        b.iter(|| decode_heart_rate(black_box("6b00720872acf5020000000017004b")))
    });
}

fn bench_monitor(c: &mut Criterion) {
    let mut group = c.benchmark_group("monitor");

    for size in [100, 1_000, 10_000] {
        let events = event_stream(size);
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &events, |b, events| {
            b.iter(|| {
                let mut monitor = HeartRateMonitor::new(None);
                let mut readings = 0;
                for event in events {
                    readings += monitor.process(black_box(event)).map_or(0, |r| r.len());
                }
                readings
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_monitor);
criterion_main!(benches);
