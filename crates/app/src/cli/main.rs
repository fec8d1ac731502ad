//! otodeck CLI Application

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use otodeck_core::domain::{
    AudioBuffer, AudioEnumerator, ConfigManager, DeckCommand, DeckSide, DeviceId, FilterChain,
    FilterKind, ImpulseResponse, OtodeckConfig, ProcessSpec, SignalKind,
};
use otodeck_infra::{CpalEnumerator, DeckEngine, OutputStream};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Level of the white noise fed to deck B with `--noise`
const NOISE_AMPLITUDE: f32 = 0.2;

#[derive(Parser)]
#[command(name = "otodeck")]
#[command(about = "Two-deck DJ filter engine", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List output-capable audio devices
    Devices {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play both decks and read deck commands from stdin
    Play(PlayArgs),

    /// Print the impulse response of the filter cascade
    Impulse(ImpulseArgs),

    /// Show or create the configuration file
    Config {
        /// Config file to use instead of the default location
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration in effect
    Show,

    /// Write the factory default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct PlayArgs {
    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output device name (default: from config, then the system default)
    #[arg(long)]
    device: Option<String>,

    /// Tone played on deck A, in Hz
    #[arg(long, default_value_t = 440.0)]
    tone_a: f64,

    /// Tone played on deck B, in Hz
    #[arg(long, default_value_t = 660.0)]
    tone_b: f64,

    /// Feed deck B with white noise instead of a tone
    #[arg(long)]
    noise: bool,
}

#[derive(Args)]
struct ImpulseArgs {
    #[arg(long, default_value_t = 44100.0)]
    sample_rate: f64,

    /// Low-pass cutoff in Hz
    #[arg(long, default_value_t = 20000.0, allow_negative_numbers = true)]
    low_pass: f64,

    /// Band-pass centre in Hz
    #[arg(long, default_value_t = 1000.0, allow_negative_numbers = true)]
    band_pass: f64,

    /// High-pass cutoff in Hz
    #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
    high_pass: f64,

    /// Length of the measured response
    #[arg(long, default_value_t = 44100)]
    samples: usize,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ImpulseReport {
    sample_rate: f64,
    low_pass_hz: f64,
    band_pass_hz: f64,
    high_pass_hz: f64,
    stable: bool,
    peak: f32,
    energy: f64,
    settling_sample: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins, then --verbose, then the config file's log level
    let explicit_level = cli.verbose || std::env::var_os("RUST_LOG").is_some();
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_filter_reloading();
    let log_filter = builder.reload_handle();
    builder.init();

    match cli.command {
        Command::Devices { json } => devices(json),
        Command::Impulse(args) => impulse(args),
        Command::Config { config, action } => config_command(config, action).await,
        Command::Play(args) => {
            let manager = config_manager(args.config.clone())?;
            let config = manager.load().await;
            if !explicit_level {
                match EnvFilter::try_new(&config.app.log_level) {
                    Ok(level) => {
                        if let Err(e) = log_filter.reload(level) {
                            warn!(error = %e, "Failed to apply configured log level");
                        }
                    }
                    Err(e) => warn!(level = %config.app.log_level, error = %e, "Invalid log level in config"),
                }
            }
            play(args, config).await
        }
    }
}

fn config_manager(path: Option<PathBuf>) -> anyhow::Result<ConfigManager> {
    match path {
        Some(path) => Ok(ConfigManager::with_file(path)),
        None => Ok(ConfigManager::new(ConfigManager::default_config_dir()?)),
    }
}

fn devices(json: bool) -> anyhow::Result<()> {
    let enumerator = CpalEnumerator::new();
    let devices = enumerator
        .output_devices()
        .context("Failed to enumerate audio devices")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    let default_id = enumerator.default_output_device().ok().map(|d| d.id);
    if devices.is_empty() {
        println!("No output devices found");
    }
    for device in &devices {
        let marker = if default_id.as_ref() == Some(&device.id) { "*" } else { " " };
        let rates: Vec<String> = device.sample_rates.iter().map(|r| r.hz().to_string()).collect();
        println!(
            "{marker} {} ({} ch, {} Hz)",
            device.name,
            device.max_output_channels,
            rates.join("/")
        );
    }
    Ok(())
}

fn impulse(args: ImpulseArgs) -> anyhow::Result<()> {
    if args.samples == 0 {
        bail!("--samples must be positive");
    }

    let chain = FilterChain::new();
    chain.prepare(&ProcessSpec::new(args.sample_rate, args.samples, 1));
    for (kind, frequency) in [
        (FilterKind::LowPass, args.low_pass),
        (FilterKind::BandPass, args.band_pass),
        (FilterKind::HighPass, args.high_pass),
    ] {
        let update = chain.set_frequency(kind, frequency);
        if update.fell_back && !args.json {
            println!("{kind}: {frequency} Hz is out of range, using {} Hz", update.applied);
        }
    }

    let response = ImpulseResponse::of_chain(&chain, args.samples);
    let report = ImpulseReport {
        sample_rate: chain.sample_rate(),
        low_pass_hz: chain.stage(FilterKind::LowPass).frequency(),
        band_pass_hz: chain.stage(FilterKind::BandPass).frequency(),
        high_pass_hz: chain.stage(FilterKind::HighPass).frequency(),
        stable: chain.coefficients().0.iter().all(|c| c.is_stable()),
        peak: response.peak,
        energy: response.energy,
        settling_sample: response.settling_sample,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "cascade @ {} Hz: lp {} Hz | bp {} Hz | hp {} Hz",
        report.sample_rate, report.low_pass_hz, report.band_pass_hz, report.high_pass_hz
    );
    println!("stable:   {}", report.stable);
    println!("peak:     {:.6}", report.peak);
    println!("energy:   {:.6}", report.energy);
    match report.settling_sample {
        Some(n) => println!(
            "settled:  sample {n} ({:.1} ms)",
            n as f64 * 1000.0 / report.sample_rate
        ),
        None => println!("settled:  not within {} samples", args.samples),
    }
    Ok(())
}

async fn config_command(path: Option<PathBuf>, action: ConfigAction) -> anyhow::Result<()> {
    let manager = config_manager(path)?;

    match action {
        ConfigAction::Show => {
            let config = manager.load().await;
            println!("# {}", manager.config_path().display());
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            if manager.exists() && !force {
                bail!(
                    "{} already exists, use --force to overwrite",
                    manager.config_path().display()
                );
            }
            manager
                .save(&OtodeckConfig::factory_default())
                .await
                .context("Failed to write config")?;
            println!("Wrote {}", manager.config_path().display());
        }
    }
    Ok(())
}

async fn play(args: PlayArgs, config: OtodeckConfig) -> anyhow::Result<()> {
    config.validate().context("Invalid configuration")?;

    let enumerator = CpalEnumerator::new();
    let device_id = args
        .device
        .or_else(|| config.audio.output_device().map(str::to_string))
        .map(DeviceId::new);
    let device = enumerator
        .output_device(device_id.as_ref())
        .context("Failed to open output device")?;

    let deck_b = if args.noise {
        SignalKind::WhiteNoise {
            amplitude: NOISE_AMPLITUDE,
        }
    } else {
        SignalKind::Sine {
            frequency: args.tone_b,
        }
    };
    let (mut engine, handles) = DeckEngine::new([
        SignalKind::Sine {
            frequency: args.tone_a,
        },
        deck_b,
    ]);

    let settings = config.audio.stream_settings();
    engine.prepare(ProcessSpec::from(&settings));
    for (side, handle) in DeckSide::ALL.iter().zip(&handles) {
        if let Some(deck) = config.deck(&side.to_string()) {
            handle.apply(deck);
        }
    }

    let stream = OutputStream::open(&device, settings, move |buffer: &mut AudioBuffer| {
        engine.render(buffer)
    })
    .context("Failed to start playback")?;

    info!(device = %stream.device_name(), "Playing");
    println!("Commands: <a|b> <lp|bp|hp|gain|room|damping|wet|dry> <value>, status, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<DeckCommand>() {
            Ok(DeckCommand::Quit) => break,
            Ok(command) => match command.deck() {
                Some(side) => println!("{}", command.apply(&handles[side.index()])),
                None => {
                    for handle in &handles {
                        println!("{}", command.apply(handle));
                    }
                }
            },
            Err(e) => eprintln!("{e}"),
        }
    }

    let errors = stream.error_count();
    if errors > 0 {
        warn!(errors, "Output stream reported errors");
    }
    info!("Stopped");
    Ok(())
}
