//! Benchmarks for the feed-to-markers pipeline
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use transport_map::model::{decode_vehicles, VehiclePosition};
use transport_map::server::feed::parse_feed;
use transport_map::source::retain_finite;
use transport_map::view::{build_markers, ViewState};

fn create_feed(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                "{},{},{},{},{},{},{},Z,,\n",
                i % 3 + 1,
                i % 40,
                59_400_000 + i as i64 * 10,
                24_700_000 + i as i64 * 10,
                i % 60,
                i % 360,
                1000 + i
            )
        })
        .collect()
}

fn create_body(count: usize) -> String {
    let records: Vec<String> = (0..count)
        .map(|i| {
            let latitude = if i % 10 == 0 {
                "NaN".to_string()
            } else {
                format!("{}", 59.4 + i as f64 * 1e-5)
            };
            format!(
                r#"{{"latitude":{},"longitude":24.7,"speed":{},"heading":{},"transport_type":"bus","line_number":"{}"}}"#,
                latitude,
                i % 60,
                i % 360,
                i % 40
            )
        })
        .collect();
    format!("[{}]", records.join(","))
}

fn bench_parse_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_feed");

    for size in [100, 1000, 10000] {
        let feed = create_feed(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("rows_{}", size), |b| {
            b.iter(|| parse_feed(black_box(&feed)))
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [100, 1000, 10000] {
        let body = create_body(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("vehicles_{}", size), |b| {
            b.iter(|| retain_finite(decode_vehicles(black_box(&body)).unwrap()))
        });
    }

    group.finish();
}

fn bench_build_markers(c: &mut Criterion) {
    let mut group = c.benchmark_group("markers");

    for size in [100, 1000, 10000] {
        let state = ViewState {
            vehicles: (0..size)
                .map(|i| {
                    VehiclePosition::new(59.4 + i as f64 * 1e-5, 24.7, "bus", "5")
                        .speed(30.0)
                        .heading(90.0)
                })
                .collect(),
            loading: false,
            ..Default::default()
        };
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("build_{}", size), |b| {
            b.iter(|| build_markers(black_box(&state)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_feed, bench_decode, bench_build_markers);
criterion_main!(benches);
