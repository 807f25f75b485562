//! Throughput Benchmark for slotkv
//!
//! This benchmark measures the slot store and the line parser under
//! various workloads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use slotkv::protocol::{parse_line, LineParser};
use slotkv::storage::{SlotStore, SLOT_CAPACITY, SLOT_COUNT};
use std::sync::Arc;
use std::thread;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let store = SlotStore::new();

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_short", |b| {
        let mut i = 0usize;
        b.iter(|| {
            store.set(i % SLOT_COUNT, "Gato").unwrap();
            i += 1;
        });
    });

    group.bench_function("set_full_slot", |b| {
        let value = "x".repeat(SLOT_CAPACITY - 1);
        let mut i = 0usize;
        b.iter(|| {
            store.set(i % SLOT_COUNT, &value).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_rejected", |b| {
        let value = "x".repeat(SLOT_CAPACITY * 4);
        b.iter(|| {
            let _ = black_box(store.set(0, &value));
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let store = SlotStore::new();

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0usize;
        b.iter(|| {
            black_box(store.get(i % SLOT_COUNT).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_out_of_range", |b| {
        b.iter(|| {
            let _ = black_box(store.get(SLOT_COUNT + 1));
        });
    });

    group.finish();
}

/// Benchmark reads while other threads keep writing the same slots
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_under_writes", |b| {
        let store = Arc::new(SlotStore::new());
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let writers: Vec<_> = (0..2)
            .map(|t| {
                let store = Arc::clone(&store);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    let value = format!("writer{}", t);
                    let mut i = 0usize;
                    while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                        let _ = store.set(i % SLOT_COUNT, &value);
                        i += 1;
                    }
                })
            })
            .collect();

        let mut i = 0usize;
        b.iter(|| {
            black_box(store.get(i % SLOT_COUNT).unwrap());
            i += 1;
        });

        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        for writer in writers {
            writer.join().unwrap();
        }
    });

    group.finish();
}

/// Benchmark line framing and command parsing
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_get", |b| {
        b.iter(|| black_box(parse_line(black_box("get 3"))));
    });

    group.bench_function("parse_set", |b| {
        b.iter(|| black_box(parse_line(black_box("set 2 Gato"))));
    });

    group.bench_function("parse_invalid", |b| {
        b.iter(|| black_box(parse_line(black_box("hola que tal"))));
    });

    group.bench_function("frame_pipelined", |b| {
        let parser = LineParser::new();
        let data = b"set 1 a\nget 1\nset 2 b\nget 2\nq\n".repeat(16);
        b.iter(|| {
            let mut buf = &data[..];
            let mut lines = 0;
            while let Ok(Some((_, consumed))) = parser.parse(buf) {
                buf = &buf[consumed..];
                lines += 1;
            }
            black_box(lines)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_contended, bench_parse);
criterion_main!(benches);
