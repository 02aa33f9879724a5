//! Benchmark audio slice planning and in-memory muxing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gobmovie_media::{gcf, gmv, AudioFormat, AudioTrack, Fps, GcfSource, MemorySource, RateAccumulator};

fn make_frames(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count).map(|i| vec![(i % 251) as u8; size]).collect()
}

fn bench_rate_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_plan");
    let format = AudioFormat::pcm(2, 44100, 16);
    let ntsc = Fps::new(30000, 1001).unwrap();

    // 10 minutes of NTSC video against a long track.
    group.bench_function("ntsc_18000_frames", |b| {
        b.iter(|| {
            let mut acc = RateAccumulator::new(ntsc, &format, usize::MAX / 2).unwrap();
            acc.plan(black_box(18_000))
        });
    });

    // Clamping path: the track runs out a third of the way in.
    group.bench_function("ntsc_clamped", |b| {
        b.iter(|| {
            let mut acc = RateAccumulator::new(ntsc, &format, 6_000 * 5_888).unwrap();
            acc.plan(black_box(18_000))
        });
    });

    group.finish();
}

fn bench_mux(c: &mut Criterion) {
    let mut group = c.benchmark_group("mux");
    let fps = Fps::integer(30).unwrap();

    // 10 seconds of 8 KiB frames with 22 kHz mono audio.
    let frames = make_frames(300, 8 * 1024);
    let audio = AudioTrack::new(AudioFormat::pcm(1, 22050, 16), vec![0u8; 441_000]).unwrap();
    group.bench_function("memory_300x8k", |b| {
        b.iter(|| gmv::mux(MemorySource::new(black_box(frames.clone())), &audio, fps).unwrap());
    });

    let container = gcf::decode(gcf::encode(&frames).unwrap().into()).unwrap();
    group.bench_function("gcf_300x8k", |b| {
        b.iter(|| gmv::mux(GcfSource::new(black_box(container.clone())), &audio, fps).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_rate_plan, bench_mux);
criterion_main!(benches);
