//! Benchmarks for per-frame multipart encoding
//!
//! Measures the work a stream session does for every frame on top of the
//! transport writes:
//! - Part header formatting for typical JPEG sizes
//! - Full three-chunk encoding with a shared payload
//! - Pacer delay computation

use bytes::Bytes;
use camstream::stream::multipart::part_header;
use camstream::stream::{FramePacer, MultipartChunk, frame_delay_ms};
use camstream::test_utils::jpeg;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

/// QVGA, VGA and SVGA JPEG sizes at medium quality
const FRAME_SIZES: [usize; 3] = [8 * 1024, 24 * 1024, 48 * 1024];

fn payload(len: usize) -> Bytes {
    jpeg(&vec![0x5A; len.saturating_sub(4)])
}

fn bench_part_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("part_header");

    for len in FRAME_SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| black_box(part_header(black_box(len))))
        });
    }

    group.finish();
}

fn bench_frame_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encoding");

    for len in FRAME_SIZES {
        let data = payload(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| {
                let chunk = MultipartChunk::for_payload(black_box(data.clone()));
                black_box(chunk.into_parts())
            })
        });
    }

    group.finish();
}

fn bench_pacing(c: &mut Criterion) {
    let mut group = c.benchmark_group("pacing");

    group.bench_function("frame_delay_ms", |b| {
        b.iter(|| black_box(frame_delay_ms(black_box(100), black_box(37))))
    });

    group.bench_function("pacer_cycle", |b| {
        let mut pacer = FramePacer::new(Duration::from_millis(100));
        let mut now = 0u64;
        pacer.start(now);
        b.iter(|| {
            now += 33_333;
            let elapsed = pacer.elapsed_ms(black_box(now));
            let delay = pacer.delay_for(elapsed);
            pacer.mark(now);
            black_box(delay)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_part_header, bench_frame_encoding, bench_pacing);
criterion_main!(benches);
