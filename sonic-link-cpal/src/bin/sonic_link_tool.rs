//! Hardware check for the cpal backend: list devices, record a diagnostic
//! clip, play a WAV file.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;

use sonic_link_core::models::config::{LinkConfiguration, PlaybackOverlap};
use sonic_link_core::{AudioFrame, CaptureSession, DiagnosticRecorder, LevelMeter, PlaybackSession};
use sonic_link_cpal::{CpalMicCapture, CpalSpeakerOutput, DesktopMicPermission, DeviceEnumerator};

#[derive(Parser)]
#[command(name = "sonic-link-tool")]
#[command(about = "Exercise microphone capture and speaker output")]
struct Cli {
    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List input and output devices
    Devices,

    /// Record from the microphone and save a diagnostic WAV
    Record {
        /// Recording length in seconds
        #[arg(short, long, default_value = "5")]
        seconds: u64,

        /// Directory for the WAV and its metadata sidecar
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Input device name (default device if omitted)
        #[arg(short, long)]
        device: Option<String>,

        /// JSON link configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Play a WAV file through the speaker
    Play {
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Output device name (default device if omitted)
        #[arg(short, long)]
        device: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str())).init();

    match cli.command {
        Commands::Devices => list_devices(),
        Commands::Record {
            seconds,
            out,
            device,
            config,
        } => record(seconds, out, device, config),
        Commands::Play { input, device } => play(input, device),
    }
}

fn list_devices() -> Result<()> {
    let enumerator = DeviceEnumerator::new();
    println!("host: {}", enumerator.host_name());

    println!("inputs:");
    for device in enumerator.list_input_devices()? {
        print_device(&device);
    }
    println!("outputs:");
    for device in enumerator.list_output_devices()? {
        print_device(&device);
    }
    Ok(())
}

fn print_device(device: &sonic_link_core::AudioSource) {
    let marker = if device.is_default { "*" } else { " " };
    let rate = device
        .default_sample_rate
        .map(|r| format!("{} Hz", r))
        .unwrap_or_else(|| "? Hz".into());
    let channels = device
        .channels
        .map(|c| format!("{} ch", c))
        .unwrap_or_else(|| "? ch".into());
    println!("  {} {} ({}, {})", marker, device.name, rate, channels);
}

fn record(seconds: u64, out: PathBuf, device: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let mut config = match config {
        Some(path) => LinkConfiguration::from_json_file(&path)?,
        None => LinkConfiguration::default(),
    };
    if device.is_some() {
        config.input_device_id = device;
    }
    config.diagnostic_cap_secs = config.diagnostic_cap_secs.max(seconds as f64);
    if let Err(reason) = config.validate() {
        bail!("invalid configuration: {}", reason);
    }

    let recorder = Arc::new(Mutex::new(DiagnosticRecorder::from_config(&config)));
    recorder.lock().prepare();
    let mut meter = LevelMeter::new(config.level_interval_blocks, config.noise_floor);

    let mut session = CaptureSession::new(
        CpalMicCapture::from_config(&config),
        Arc::new(DesktopMicPermission::new(config.input_device_id.clone())),
        config.sample_rate,
    );
    println!("recording from {} for {}s", session.device_info().name, seconds);

    let sink = Arc::clone(&recorder);
    session.start(Box::new(move |frame: AudioFrame<'_>| {
        sink.lock().record(&frame);
        if let Some(level) = meter.observe(frame.samples) {
            log::info!(
                "level rms {:.4} peak {:.4}{}",
                level.rms,
                level.peak,
                if level.signal_present { " (signal)" } else { "" }
            );
        }
    }))?;

    thread::sleep(Duration::from_secs(seconds));
    session.stop()?;

    let diagnostics = session.diagnostics();
    println!(
        "{} callbacks, {} samples at {} Hz / {} ch",
        diagnostics.callback_count,
        diagnostics.samples_total,
        diagnostics.input_sample_rate,
        diagnostics.input_channels
    );

    let result = recorder
        .lock()
        .save(&out)
        .context("no audio was captured")?;
    println!(
        "saved {:.2}s to {} (sha256 {})",
        result.duration_secs,
        result.file_path.display(),
        result.checksum
    );
    Ok(())
}

fn play(input: PathBuf, device: Option<String>) -> Result<()> {
    let waveform = sonic_link_core::load_wav(&input)?;
    let output = match device {
        Some(id) => CpalSpeakerOutput::with_device(id),
        None => CpalSpeakerOutput::default_device(),
    };
    let session = PlaybackSession::new(output, PlaybackOverlap::Reject, Duration::from_millis(200));

    println!(
        "playing {:.2}s from {} on {}",
        waveform.duration().as_secs_f64(),
        input.display(),
        session.device_info().name
    );
    session.play(&waveform)?;
    Ok(())
}
