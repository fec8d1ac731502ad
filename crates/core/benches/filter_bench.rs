// Performance benchmarks for the filter cascade
//
// Run with: cargo bench --bench filter_bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use otodeck_core::domain::{
    AudioBuffer, BlockProcessor, ChannelState, Deck, FilterChain, FilterKind, ProcessSpec,
    ReverbSettings,
};
use std::hint::black_box;

fn noise_buffer(channels: usize, samples: usize) -> AudioBuffer {
    AudioBuffer::from_channels(
        (0..channels)
            .map(|ch| {
                (0..samples)
                    .map(|i| (((i + ch) * 7919) % 199) as f32 / 99.5 - 1.0)
                    .collect()
            })
            .collect(),
    )
}

fn bench_design(c: &mut Criterion) {
    let mut group = c.benchmark_group("coefficient_design");

    for kind in FilterKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            b.iter(|| black_box(kind.design(black_box(48000.0), black_box(1234.0))));
        });
    }

    group.finish();
}

fn bench_process_channel(c: &mut Criterion) {
    let chain = FilterChain::new();
    chain.prepare(&ProcessSpec::default());
    chain.set_frequency(FilterKind::LowPass, 5000.0);
    chain.set_frequency(FilterKind::HighPass, 80.0);

    let mut state = ChannelState::default();
    let mut samples: Vec<f32> = (0..512).map(|i| (i as f32 * 0.01).sin()).collect();

    c.bench_function("chain_process_channel_512_samples", |b| {
        b.iter(|| {
            chain.process_channel(&mut state, black_box(&mut samples));
        });
    });
}

fn bench_process_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_processor");

    for block_size in [64, 256, 512, 1024] {
        let mut processor = BlockProcessor::new();
        processor.prepare(ProcessSpec::new(44100.0, block_size, 2));
        let mut buffer = noise_buffer(2, block_size);

        group.bench_with_input(
            BenchmarkId::new("stereo", block_size),
            &block_size,
            |b, _| {
                b.iter(|| processor.process_block(black_box(&mut buffer)));
            },
        );
    }

    group.finish();
}

fn bench_retune_while_processing(c: &mut Criterion) {
    let mut processor = BlockProcessor::new();
    processor.prepare(ProcessSpec::default());
    let controller = processor.controller();
    let mut buffer = noise_buffer(2, 512);
    let mut frequency = 200.0;

    c.bench_function("retune_then_process_512_samples", |b| {
        b.iter(|| {
            frequency = if frequency > 10000.0 { 200.0 } else { frequency * 1.1 };
            controller.set_low_pass_frequency(frequency);
            processor.process_block(black_box(&mut buffer));
        });
    });
}

fn bench_deck(c: &mut Criterion) {
    let (mut deck, handle) = Deck::new("A");
    deck.prepare(ProcessSpec::default());
    handle.set_gain(0.8);
    let mut buffer = noise_buffer(2, 512);

    c.bench_function("deck_process_block_512_samples", |b| {
        b.iter(|| {
            deck.process_block(black_box(&mut buffer), |_: &mut AudioBuffer, _: &ReverbSettings| {});
        });
    });
}

criterion_group!(
    benches,
    bench_design,
    bench_process_channel,
    bench_process_block,
    bench_retune_while_processing,
    bench_deck
);
criterion_main!(benches);
