//! Control thread vs. audio thread
//!
//! A writer retunes while readers stream or inspect snapshots. Every
//! observed snapshot must be internally consistent.

use otodeck_core::domain::{
    AudioBlock, AudioBuffer, BlockProcessor, Deck, FilterChain, FilterKind, ProcessSpec,
    ReverbSettings,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Frequencies the writer cycles through, some of them invalid
const SWEEP: [f64; 8] = [40.0, -5.0, 250.0, 1200.0, 25000.0, 5000.0, f64::NAN, 18000.0];

#[test]
fn test_snapshots_are_never_torn() {
    let chain = FilterChain::new();
    chain.prepare(&ProcessSpec::new(48000.0, 256, 2));
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            for round in 0..5_000 {
                let kind = FilterKind::ALL[round % 3];
                chain.set_frequency(kind, SWEEP[round % SWEEP.len()]);
                if round % 1000 == 500 {
                    let sample_rate = if (round / 1000) % 2 == 0 { 44100.0 } else { 48000.0 };
                    chain.prepare(&ProcessSpec::new(sample_rate, 256, 2));
                }
            }
            stop.store(true, Ordering::Release);
        });

        let mut observed = 0u64;
        while !stop.load(Ordering::Acquire) || observed == 0 {
            for stage in chain.stages() {
                let snapshot = stage.snapshot();
                assert_eq!(
                    snapshot.coefficients,
                    stage.kind().design(snapshot.sample_rate, snapshot.frequency),
                    "torn snapshot on {}",
                    stage.kind()
                );
                assert!(snapshot.coefficients.is_stable());
                observed += 1;
            }
        }
    });

    // The writer's last request is what sticks
    let last = 4_999;
    let kind = FilterKind::ALL[last % 3];
    assert_eq!(
        chain.stage(kind).frequency(),
        kind.validate(SWEEP[last % SWEEP.len()]).applied
    );
}

#[test]
fn test_streaming_while_retuning_stays_finite() {
    let mut processor = BlockProcessor::new();
    processor.prepare(ProcessSpec::new(44100.0, 512, 2));
    let controller = processor.controller();
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            for round in 0..2_000 {
                controller.request_frequency(FilterKind::ALL[round % 3], SWEEP[round % SWEEP.len()]);
            }
            stop.store(true, Ordering::Release);
        });

        let mut buffer = AudioBuffer::new(2, 512);
        let mut phase = 0.0_f32;
        let mut blocks = 0;
        while !stop.load(Ordering::Acquire) || blocks < 10 {
            for i in 0..512 {
                let sample = (phase + i as f32 * 0.07).sin() * 0.8;
                buffer.channel_mut(0)[i] = sample;
                buffer.channel_mut(1)[i] = -sample;
            }
            phase += 512.0 * 0.07;

            processor.process_block(&mut buffer);

            for ch in 0..2 {
                assert!(buffer.channel(ch).iter().all(|s| s.is_finite()));
            }
            blocks += 1;
        }
    });

    // Three of the eight sweep values are invalid
    assert_eq!(controller.fallback_count(), 2_000 / 8 * 3);
}

#[test]
fn test_concurrent_reverb_updates_are_not_lost() {
    let (_deck, handle) = Deck::new("A");
    let room = handle.clone();
    let wet = handle.clone();

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..=1000 {
                room.set_room_size(f64::from(i) / 1000.0);
            }
        });
        s.spawn(|| {
            for i in 0..=1000 {
                wet.set_wet_level(f64::from(i) / 1000.0);
            }
        });
    });

    let settings = handle.reverb_settings();
    assert_eq!(settings.room_size, 1.0);
    assert_eq!(settings.wet_level, 1.0);
    assert_eq!(settings.dry_level, ReverbSettings::default().dry_level);
}

#[test]
fn test_deck_handle_moves_to_control_thread() {
    let (mut deck, handle) = Deck::new("B");
    deck.prepare(ProcessSpec::new(44100.0, 64, 1));

    thread::spawn(move || {
        handle.set_gain(0.0);
    })
    .join()
    .unwrap();

    let mut buffer = AudioBuffer::from_channels(vec![vec![0.9; 64]]);
    deck.process_block(&mut buffer, |_: &mut AudioBuffer, _: &ReverbSettings| {});
    assert!(buffer.channel(0).iter().all(|&s| s == 0.0));
}
