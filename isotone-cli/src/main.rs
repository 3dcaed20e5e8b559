//! Isotone CLI — real-time isochronic tone player.
//!
//! Commands typed on stdin while playing:
//! - `p` : pause / resume
//! - `s` : stop
//! - `r` : restart from the beginning of the ramp
//! - `q` : quit

mod args;

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use isotone_engine::{
    output_device_names, AudioEngine, CpalBackend, PlaybackState, PulseMonitor, SystemClock, ToneParameters,
    SUPPORTED_BUFFER_SIZES, SUPPORTED_SAMPLE_RATES,
};
use tracing::{info, warn};

use crate::args::{Cli, Commands, PlayArgs};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    TogglePause,
    Stop,
    Restart,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => None,
            "p" => Some(Self::TogglePause),
            "s" => Some(Self::Stop),
            "r" => Some(Self::Restart),
            "q" => Some(Self::Quit),
            other => Some(Self::Unknown(other.to_string())),
        }
    }
}

fn spawn_stdin_reader() -> Result<Receiver<Command>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("isotone-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if let Some(cmd) = Command::parse(&line) {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
            }
        })
        .context("spawning stdin reader")?;
    Ok(rx)
}

fn warn_if_off_preset(params: &ToneParameters) {
    if !SUPPORTED_SAMPLE_RATES.contains(&params.sample_rate) {
        warn!(sample_rate = params.sample_rate, "sample rate is not one of the presets {SUPPORTED_SAMPLE_RATES:?}");
    }
    if !SUPPORTED_BUFFER_SIZES.contains(&params.buffer_size) {
        warn!(buffer_size = params.buffer_size, "buffer size is not one of the presets {SUPPORTED_BUFFER_SIZES:?}");
    }
}

/// When a `--duration` of `secs` started now runs out.
fn deadline_after(secs: f64) -> Result<Instant> {
    let span = Duration::try_from_secs_f64(secs).with_context(|| format!("invalid --duration {secs}"))?;
    Instant::now()
        .checked_add(span)
        .with_context(|| format!("--duration {secs} is too far in the future"))
}

fn play(args: &PlayArgs) -> Result<()> {
    let params = args::resolve_parameters(args)?;
    warn_if_off_preset(&params);
    let deadline = args.duration.map(deadline_after).transpose()?;

    let backend = match &args.device {
        Some(name) => CpalBackend::with_device(name.clone()),
        None => CpalBackend::new(),
    };
    let mut engine = AudioEngine::with_clock(backend, std::sync::Arc::new(SystemClock::new()), args.seed);
    engine.set_parameters(params.clone())?;

    println!("isotone — isochronic tone player\n");
    println!(
        "Carrier: {:.2} Hz | Pulse: {:.2} → {:.2} Hz | Volume: {:.2}",
        params.carrier_hz, params.start_pulse_hz, params.final_pulse_hz, params.volume
    );
    if let Some(d) = args.duration {
        println!("Auto-stop after {d} seconds");
    }
    println!("Commands: p = pause/resume, s = stop, r = restart, q = quit\n");

    engine.start().context("starting playback")?;

    let _monitor = if args.quiet {
        None
    } else {
        Some(PulseMonitor::spawn_default(engine.probe(), |r| {
            let mut out = io::stdout().lock();
            let _ = write!(out, "\rCurrent Pulse Frequency: {:.2} Hz ", r.pulse_hz);
            let _ = out.flush();
        })?)
    };

    let commands = spawn_stdin_reader()?;

    loop {
        let wait = deadline.map_or(Duration::from_millis(250), |d| d.saturating_duration_since(Instant::now()));
        match commands.recv_timeout(wait) {
            Ok(Command::TogglePause) => match engine.state() {
                PlaybackState::Running => engine.pause()?,
                PlaybackState::Paused => engine.start()?,
                PlaybackState::Stopped => println!("\nstopped; press r to start again"),
            },
            Ok(Command::Stop) => engine.stop(),
            Ok(Command::Restart) => {
                engine.stop();
                engine.start().context("restarting playback")?;
            }
            Ok(Command::Quit) => break,
            Ok(Command::Unknown(s)) => println!("\nunknown command `{s}` (p, s, r, q)"),
            Err(RecvTimeoutError::Timeout) => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                // stdin closed; keep playing until the deadline, if any
                if let Some(d) = deadline {
                    thread::sleep(d.saturating_duration_since(Instant::now()));
                }
                break;
            }
        }
    }

    engine.stop();
    println!();
    info!("bye");
    Ok(())
}

fn list_devices() -> Result<()> {
    println!("Available output devices:");
    for name in output_device_names()? {
        println!("- {name}");
    }
    Ok(())
}

fn generate_config(out: Option<&std::path::Path>) -> Result<()> {
    let text = toml::to_string_pretty(&ToneParameters::default()).context("serializing defaults")?;
    match out {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Play(args) => play(args),
        Commands::ListDevices => list_devices(),
        Commands::GenerateConfig { out } => generate_config(out.as_deref()),
    }
}
