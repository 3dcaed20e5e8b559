//! Per-callback cost of rendering one block at the preset buffer sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use isotone_core::phase::PhaseState;
use isotone_core::synth::ToneSynthesizer;

fn render_block(c: &mut Criterion) {
    let synth = ToneSynthesizer::new(220.0, 15.0, 48_000.0, 0.5);
    let mut group = c.benchmark_group("render_into");
    for frames in [1024usize, 4096, 32768] {
        let mut buf = vec![0.0_f32; frames];
        group.throughput(Throughput::Elements(frames as u64));
        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, _| {
            let mut phase = PhaseState::new();
            b.iter(|| {
                phase = synth.render_into(black_box(&mut buf), phase);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, render_block);
criterion_main!(benches);
