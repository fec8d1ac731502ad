//! Config file -> deck engine -> rendered audio
//!
//! Exercises the path the `play` command takes, minus the audio device.

use otodeck_core::domain::{
    AudioBlock, AudioBuffer, CommandResult, ConfigManager, DeckCommand, DeckHandle, DeckSettings,
    DeckSide, FilterKind, OtodeckConfig, SignalKind,
};
use otodeck_infra::{render_interleaved, DeckEngine};
use tempfile::TempDir;

fn peak(buffer: &AudioBuffer, channel: usize) -> f32 {
    buffer
        .channel(channel)
        .iter()
        .fold(0.0_f32, |m, s| m.max(s.abs()))
}

fn engine_from(config: &OtodeckConfig, sources: [SignalKind; 2]) -> (DeckEngine, [DeckHandle; 2]) {
    let (mut engine, handles) = DeckEngine::new(sources);
    engine.prepare(config.audio.process_spec());
    for (side, handle) in DeckSide::ALL.iter().zip(&handles) {
        if let Some(deck) = config.deck(&side.to_string()) {
            handle.apply(deck);
        }
    }
    (engine, handles)
}

#[tokio::test]
async fn test_saved_config_drives_the_decks() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(temp_dir.path().to_path_buf());

    let mut config = OtodeckConfig::factory_default();
    config.audio.block_size = 128;
    let mut deck_a = DeckSettings::new("A");
    deck_a.gain = 0.25;
    deck_a.filters.low_pass_hz = 4000.0;
    deck_a.filters.high_pass_hz = 80.0;
    deck_a.reverb.wet_level = 0.3;
    config.decks = vec![deck_a, DeckSettings::new("b")];
    manager.save(&config).await.unwrap();

    let loaded = manager.load().await;
    assert_eq!(loaded, config);

    let (mut engine, handles) = engine_from(&loaded, [SignalKind::Silence, SignalKind::Silence]);
    let status = handles[DeckSide::A.index()].status();
    assert_eq!(status.gain, 0.25);
    assert_eq!(status.low_pass_hz, 4000.0);
    assert_eq!(status.band_pass_hz, 1000.0);
    assert_eq!(status.high_pass_hz, 80.0);
    assert_eq!(status.reverb.wet_level, 0.3);

    // Deck names in the file are matched case-insensitively
    assert_eq!(handles[DeckSide::B.index()].status().gain, 1.0);

    let mut out = AudioBuffer::new(2, 128);
    engine.render(&mut out);
    assert_eq!(peak(&out, 0), 0.0);
}

#[tokio::test]
async fn test_corrupt_config_falls_back_and_still_plays() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(temp_dir.path().to_path_buf());
    tokio::fs::write(manager.config_path(), "[audio\nsample_rate = ")
        .await
        .unwrap();

    let config = manager.load().await;

    assert_eq!(config, OtodeckConfig::factory_default());
    assert!(manager.config_path().with_extension("toml.corrupt").exists());

    let (mut engine, _) = engine_from(&config, [SignalKind::Impulse, SignalKind::Silence]);
    let mut out = AudioBuffer::new(2, config.audio.block_size as usize);
    engine.render(&mut out);
    assert!(out.channel(0).iter().all(|s| s.is_finite()));
    assert!(peak(&out, 0) > 0.0);
}

#[test]
fn test_typed_commands_reach_the_right_deck() {
    let config = OtodeckConfig::factory_default();
    let (_engine, handles) = engine_from(&config, [SignalKind::Silence, SignalKind::Silence]);

    let command: DeckCommand = "B lp 2500".parse().unwrap();
    let side = command.deck().unwrap();
    let result = command.apply(&handles[side.index()]);

    assert!(matches!(&result, CommandResult::FrequencyChanged { deck, update }
        if deck == "B" && update.applied == 2500.0 && !update.fell_back));
    assert_eq!(handles[1].filters().frequency(FilterKind::LowPass), 2500.0);
    assert_eq!(handles[0].filters().frequency(FilterKind::LowPass), 20000.0);
}

#[test]
fn test_out_of_range_commands() {
    let config = OtodeckConfig::factory_default();
    let (_engine, handles) = engine_from(&config, [SignalKind::Silence, SignalKind::Silence]);

    let hp: DeckCommand = "a hp -5".parse().unwrap();
    let result = hp.apply(&handles[0]);
    assert_eq!(result.to_string(), "deck A: high-pass -5 Hz out of range, using 500 Hz");
    assert_eq!(handles[0].filters().frequency(FilterKind::HighPass), 500.0);

    let gain: DeckCommand = "a gain 1.5".parse().unwrap();
    assert!(matches!(gain.apply(&handles[0]), CommandResult::ValueIgnored { .. }));
    assert_eq!(handles[0].gain(), 1.0);
}

#[test]
fn test_muted_deck_leaves_only_the_other() {
    let config = OtodeckConfig::factory_default();
    let tone = SignalKind::Sine { frequency: 1000.0 };
    let (mut engine, handles) = engine_from(&config, [tone, tone]);

    let mut both = AudioBuffer::new(2, 512);
    engine.render(&mut both);

    "b gain 0".parse::<DeckCommand>().unwrap().apply(&handles[1]);
    let mut one = AudioBuffer::new(2, 512);
    engine.render(&mut one);

    assert!(peak(&one, 0) > 0.0);
    assert!(peak(&one, 0) < peak(&both, 0));
}

#[test]
fn test_interleaved_render_of_engine_output() {
    let config = OtodeckConfig::factory_default();
    let (mut engine, _) = engine_from(&config, [SignalKind::Impulse, SignalKind::Silence]);
    let mut scratch = AudioBuffer::new(2, 64);

    // Three full frames and a dangling half frame
    let mut data = vec![9.0_f32; 7];
    render_interleaved(&mut data, &mut scratch, &mut |buffer: &mut AudioBuffer| {
        engine.render(buffer)
    });

    assert_eq!(data[0], data[1], "both channels carry the same deck signal");
    assert_eq!(data[6], 0.0);
    assert!(data.iter().all(|s| s.is_finite()));
}
