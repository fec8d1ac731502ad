//! Example printing the impulse and magnitude response of a tuned cascade
//!
//! Run with: cargo run --package otodeck-core --example impulse_response

use otodeck_core::domain::{
    AudioBlock, AudioBuffer, BlockProcessor, FilterKind, ProcessSpec, SignalGenerator, SignalKind,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("otodeck_core=debug,info")
        .init();

    println!("=== otodeck Filter Cascade Demo ===\n");

    let sample_rate = 44100.0;
    let mut processor = BlockProcessor::new();
    processor.prepare(ProcessSpec::new(sample_rate, 1024, 1));

    let controller = processor.controller();
    controller.set_low_pass_frequency(6000.0);
    controller.set_band_pass_frequency(1000.0);
    controller.set_high_pass_frequency(80.0);
    // Out of range on purpose: the stage falls back to 500 Hz and logs a warning
    controller.set_high_pass_frequency(-5.0);

    println!("1. Stage tuning:");
    for stage in processor.chain().stages() {
        let coeffs = stage.coefficients();
        println!(
            "   {:<10} {:>8.1} Hz  stable: {}",
            stage.kind().to_string(),
            stage.frequency(),
            coeffs.is_stable()
        );
    }

    println!("\n2. Cascade magnitude response:");
    let coefficients = processor.chain().coefficients();
    for frequency in [50.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0] {
        let gain: f64 = coefficients
            .0
            .iter()
            .map(|c| c.magnitude_at(sample_rate, frequency))
            .product();
        println!("   {:>7.0} Hz  {:>7.2} dB", frequency, 20.0 * gain.max(1e-12).log10());
    }

    println!("\n3. Impulse response (first 16 samples):");
    let mut buffer = AudioBuffer::new(1, 1024);
    SignalGenerator::new(SignalKind::Impulse).fill(&mut buffer);
    processor.process_block(&mut buffer);
    for (i, sample) in buffer.channel(0).iter().take(16).enumerate() {
        println!("   [{i:2}] {sample:+.6}");
    }

    println!(
        "\n   fallback requests so far: {}",
        controller.fallback_count()
    );
    println!("   high-pass now at {} Hz", controller.frequency(FilterKind::HighPass));
}
