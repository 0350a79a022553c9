use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use target_detector_core::{normalize_frame, Encoding, Header, RawFrame};

fn synthetic(encoding: Encoding, width: u32, height: u32) -> RawFrame {
    let len = (width * height) as usize * encoding.bytes_per_pixel();
    let data = (0..len).map(|i| (i * 37 % 251) as u8).collect();
    RawFrame::new(Header::default(), width, height, encoding, data)
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_1280x960");
    for tag in ["bgr8", "mono8", "bayer_rggb8", "mono16", "rgb16", "32FC1"] {
        let enc: Encoding = tag.parse().expect("encoding");
        let frame = synthetic(enc, 1280, 960);
        group.bench_with_input(BenchmarkId::from_parameter(tag), &frame, |b, f| {
            b.iter(|| normalize_frame(black_box(f)).expect("valid"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
