//! Criterion benchmarks for the frame-relay codec and timing statistics.
//!
//! The hot path is a 1024x768 grayscale frame: header encode, full-message
//! encode, and streaming decode from an accumulation buffer.
//!
//! Run with:
//! ```bash
//! cargo bench --package relay-core --bench codec_bench
//! ```

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relay_core::protocol::{decode_message, encode_header, encode_message, Message};
use relay_core::TimingStats;

// ── Fixtures ──────────────────────────────────────────────────────────────────

const FRAME_NAME: &str =
    "Scrn_H 1024 Scrn_V 768 Noise_Gn 60 In_Gn 75 Out_Gn 180 Gma_Gn 100 Cycle_Tme 64 Fade_Tme 38";

fn make_frame(width: usize, height: usize) -> Message {
    let pixels: Vec<u8> = (0..width * height).map(|i| (i % 251) as u8).collect();
    Message::image(FRAME_NAME, pixels)
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let display_now = Message::display_now("cam0");
    group.bench_function("header_only/DisplayNow", |b| {
        b.iter(|| encode_header(black_box(&display_now)))
    });

    for (w, h) in [(320, 240), (1024, 768)] {
        let frame = make_frame(w, h);
        group.bench_with_input(
            BenchmarkId::new("header_only/Image", format!("{w}x{h}")),
            &frame,
            |b, frame| b.iter(|| encode_header(black_box(frame))),
        );
        group.bench_with_input(
            BenchmarkId::new("full/Image", format!("{w}x{h}")),
            &frame,
            |b, frame| b.iter(|| encode_message(black_box(frame))),
        );
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (w, h) in [(320, 240), (1024, 768)] {
        let bytes = encode_message(&make_frame(w, h)).expect("frame fits");
        group.bench_with_input(
            BenchmarkId::new("Image", format!("{w}x{h}")),
            &bytes,
            |b, bytes| {
                b.iter(|| {
                    let mut buf = bytes.clone();
                    decode_message(black_box(&mut buf)).expect("decode must succeed")
                })
            },
        );
    }

    // Ten small control messages back to back, drained in one pass.
    let mut burst = Vec::new();
    for i in 0..10 {
        let msg = Message::display_now(format!("cam{i}"));
        burst.extend(encode_message(&msg).expect("frame fits"));
    }
    group.bench_function("DisplayNow_burst_10", |b| {
        b.iter(|| {
            let mut buf = burst.clone();
            let mut n = 0;
            while let Some(msg) = decode_message(&mut buf).expect("decode must succeed") {
                black_box(msg);
                n += 1;
            }
            n
        })
    });
    group.finish();
}

fn bench_stats(c: &mut Criterion) {
    let stats = TimingStats::with_warm_up(1);
    c.bench_function("timing_stats_increment", |b| {
        b.iter(|| stats.increment(black_box(Duration::from_micros(33_333))))
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_stats);
criterion_main!(benches);
