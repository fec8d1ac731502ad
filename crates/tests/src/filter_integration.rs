//! Integration tests for the filter cascade
//!
//! These tests drive the public API the way the audio callback and the UI
//! do: prepare once, stream blocks, retune between them.

use otodeck_core::domain::{
    AudioBlock, AudioBuffer, BiquadState, BlockProcessor, FilterChain, FilterKind,
    ImpulseResponse, ProcessSpec,
};
use proptest::prelude::*;

fn impulse(samples: usize) -> Vec<f32> {
    let mut signal = vec![0.0; samples];
    signal[0] = 1.0;
    signal
}

fn pseudo_noise(samples: usize, seed: usize) -> Vec<f32> {
    (0..samples)
        .map(|i| (((i + seed) * 7919 + seed * 104729) % 211) as f32 / 105.5 - 1.0)
        .collect()
}

fn tuned_processor(sample_rate: f64, block: usize, channels: usize) -> BlockProcessor {
    let mut processor = BlockProcessor::new();
    processor.prepare(ProcessSpec::new(sample_rate, block, channels));
    let controller = processor.controller();
    controller.set_low_pass_frequency(3000.0);
    controller.set_band_pass_frequency(900.0);
    controller.set_high_pass_frequency(60.0);
    processor
}

// ============================================================================
// END-TO-END SCENARIOS
// ============================================================================

#[test]
fn test_impulse_through_default_chain_decays() {
    let chain = FilterChain::new();
    chain.prepare(&ProcessSpec::new(44100.0, 512, 2));
    chain.set_frequency(FilterKind::LowPass, 20000.0);
    chain.set_frequency(FilterKind::BandPass, 1000.0);
    chain.set_frequency(FilterKind::HighPass, 20.0);

    let response = ImpulseResponse::of_chain(&chain, 88200);

    assert!(response.peak > 0.0);
    assert!(response.samples.iter().all(|s| s.is_finite()));
    assert!(response.has_settled(), "response never settled");
    assert!(response.tail_peak(44100) < ImpulseResponse::SETTLE_THRESHOLD);
}

#[test]
fn test_streaming_matches_sequential_reference() {
    let mut processor = tuned_processor(48000.0, 128, 2);
    let input = [pseudo_noise(512, 1), pseudo_noise(512, 2)];

    let mut streamed: [Vec<f32>; 2] = [Vec::new(), Vec::new()];
    for block in 0..4 {
        let range = block * 128..(block + 1) * 128;
        let mut buffer = AudioBuffer::from_channels(vec![
            input[0][range.clone()].to_vec(),
            input[1][range].to_vec(),
        ]);
        processor.process_block(&mut buffer);
        for (ch, out) in streamed.iter_mut().enumerate() {
            out.extend_from_slice(buffer.channel(ch));
        }
    }

    for (ch, signal) in input.iter().enumerate() {
        let mut reference = signal.clone();
        for kind in FilterKind::ALL {
            let stage = processor.chain().stage(kind);
            let mut state = BiquadState::new();
            for sample in reference.iter_mut() {
                *sample = stage.process_sample(&mut state, *sample);
            }
        }
        assert_eq!(streamed[ch], reference, "channel {ch} differs");
    }
}

#[test]
fn test_channels_are_independent() {
    let mut stereo = tuned_processor(44100.0, 256, 2);
    let mut mono = tuned_processor(44100.0, 256, 1);

    let mut both = AudioBuffer::from_channels(vec![impulse(256), pseudo_noise(256, 9)]);
    let mut alone = AudioBuffer::from_channels(vec![impulse(256)]);
    stereo.process_block(&mut both);
    mono.process_block(&mut alone);

    assert_eq!(both.channel(0), alone.channel(0));

    // Silence on one channel stays silent whatever the other carries
    let mut quiet = AudioBuffer::from_channels(vec![pseudo_noise(256, 3), vec![0.0; 256]]);
    stereo.reset();
    stereo.process_block(&mut quiet);
    assert!(quiet.channel(1).iter().all(|&s| s == 0.0));
}

#[test]
fn test_degenerate_buffers_are_noops() {
    let mut processor = tuned_processor(44100.0, 256, 2);

    let mut empty_channels = AudioBuffer::new(0, 256);
    processor.process_block(&mut empty_channels);
    assert_eq!(empty_channels, AudioBuffer::new(0, 256));

    let mut empty_samples = AudioBuffer::from_channels(vec![vec![0.5; 4], vec![0.5; 4]]);
    empty_samples.set_num_samples(0);
    let before = empty_samples.clone();
    processor.process_block(&mut empty_samples);
    assert_eq!(empty_samples, before);

    // History was not disturbed by the no-op calls
    let mut fresh = tuned_processor(44100.0, 256, 2);
    let mut a = AudioBuffer::from_channels(vec![impulse(64), impulse(64)]);
    let mut b = a.clone();
    processor.process_block(&mut a);
    fresh.process_block(&mut b);
    assert_eq!(a, b);
}

#[test]
fn test_high_pass_negative_request_uses_500_hz() {
    let chain = FilterChain::new();
    chain.prepare(&ProcessSpec::default());

    let update = chain.set_frequency(FilterKind::HighPass, -5.0);

    assert!(update.fell_back);
    assert_eq!(chain.stage(FilterKind::HighPass).frequency(), 500.0);
    assert_eq!(
        chain.stage(FilterKind::HighPass).coefficients(),
        FilterKind::HighPass.design(44100.0, 500.0)
    );
}

#[test]
fn test_magnitude_response_shapes() {
    let sr = 44100.0;
    let low = FilterKind::LowPass.design(sr, 1000.0);
    let band = FilterKind::BandPass.design(sr, 1000.0);
    let high = FilterKind::HighPass.design(sr, 1000.0);

    assert!((low.magnitude_at(sr, 0.0) - 1.0).abs() < 1e-9);
    assert!(low.magnitude_at(sr, 20000.0) < 0.01);
    assert!((low.magnitude_at(sr, 1000.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);

    assert!(high.magnitude_at(sr, 0.0) < 1e-9);
    assert!((high.magnitude_at(sr, sr / 2.0) - 1.0).abs() < 1e-9);

    assert!((band.magnitude_at(sr, 1000.0) - 1.0).abs() < 1e-9);
    assert!(band.magnitude_at(sr, 50.0) < 0.1);
    assert!(band.magnitude_at(sr, 18000.0) < 0.1);
}

#[test]
fn test_frequency_above_nyquist_stays_stable() {
    // 20 kHz is valid but above Nyquist at 22.05 kHz sampling
    let chain = FilterChain::new();
    chain.prepare(&ProcessSpec::new(22050.0, 256, 1));
    for kind in FilterKind::ALL {
        chain.set_frequency(kind, 20000.0);
    }

    assert_eq!(chain.stage(FilterKind::LowPass).frequency(), 20000.0);
    for coeffs in chain.coefficients().0 {
        assert!(coeffs.is_stable());
    }
    let response = ImpulseResponse::of_chain(&chain, 22050);
    assert!(response.samples.iter().all(|s| s.is_finite()));
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn invalid_frequency() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1.0e9..=0.0_f64,
        20000.000001..1.0e9_f64,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
}

fn any_kind() -> impl Strategy<Value = FilterKind> {
    prop_oneof![
        Just(FilterKind::LowPass),
        Just(FilterKind::BandPass),
        Just(FilterKind::HighPass),
    ]
}

proptest! {
    #[test]
    fn prop_every_valid_setting_is_stable(
        kind in any_kind(),
        frequency in prop_oneof![f64::MIN_POSITIVE..=1.0_f64, 1.0..=20000.0_f64],
        sample_rate in prop_oneof![
            Just(22050.0),
            Just(44100.0),
            Just(48000.0),
            Just(96000.0),
            8000.0..192000.0_f64,
            Just(1e12),
        ],
    ) {
        let chain = FilterChain::new();
        chain.prepare(&ProcessSpec::new(sample_rate, 512, 2));
        let update = chain.set_frequency(kind, frequency);

        prop_assert!(!update.fell_back);
        prop_assert!(chain.stage(kind).coefficients().is_stable());
    }

    #[test]
    fn prop_invalid_request_equals_direct_fallback(kind in any_kind(), requested in invalid_frequency()) {
        let via_request = FilterChain::new();
        let direct = FilterChain::new();
        via_request.prepare(&ProcessSpec::default());
        direct.prepare(&ProcessSpec::default());

        let update = via_request.set_frequency(kind, requested);
        direct.set_frequency(kind, kind.fallback_frequency());

        prop_assert!(update.fell_back);
        prop_assert_eq!(via_request.coefficients(), direct.coefficients());
    }

    #[test]
    fn prop_prepare_is_idempotent(
        sample_rate in 8000.0..192000.0_f64,
        block in 1usize..4096,
        channels in 1usize..8,
    ) {
        let chain = FilterChain::new();
        let spec = ProcessSpec::new(sample_rate, block, channels);
        chain.prepare(&spec);
        let once = chain.coefficients();
        chain.prepare(&spec);

        prop_assert_eq!(once, chain.coefficients());
    }
}
