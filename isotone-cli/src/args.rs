//! Command-line surface and parameter assembly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use isotone_engine::ToneParameters;

#[derive(Parser, Debug)]
#[command(name = "isotone")]
#[command(about = "Isochronic tone generator")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a tone on an output device
    Play(PlayArgs),

    /// List available output devices
    ListDevices,

    /// Write the default parameters as TOML
    GenerateConfig {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct PlayArgs {
    /// Base parameters from a TOML file; flags override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub tone: ToneArgs,

    /// Seed for the variation RNG (reproducible runs)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output device name (see `list-devices`)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Don't print the pulse frequency
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug, Default)]
pub struct ToneArgs {
    /// Carrier frequency (Hz)
    #[arg(long)]
    pub carrier: Option<f64>,

    /// Pulse frequency at the start of the ramp (Hz)
    #[arg(long)]
    pub start_pulse: Option<f64>,

    /// Pulse frequency at the end of the ramp (Hz)
    #[arg(long)]
    pub final_pulse: Option<f64>,

    /// Ramp duration (seconds)
    #[arg(long)]
    pub ramp: Option<f64>,

    /// Volume, 0.0 to 1.0
    #[arg(long)]
    pub volume: Option<f64>,

    /// Sample rate (Hz)
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frames per buffer
    #[arg(long)]
    pub buffer_size: Option<u32>,

    /// Disable the ramp; glide straight to the final pulse rate
    #[arg(long)]
    pub no_ramp: bool,

    /// Disable random variation
    #[arg(long)]
    pub no_vary: bool,

    /// Shortest time between retargets (seconds)
    #[arg(long)]
    pub vary_min: Option<f64>,

    /// Longest time between retargets (seconds)
    #[arg(long)]
    pub vary_max: Option<f64>,

    /// Maximum deviation from the final pulse rate (± Hz)
    #[arg(long)]
    pub vary_amount: Option<f64>,
}

impl ToneArgs {
    /// Overlay the flags that were given onto `base`.
    pub fn apply(&self, base: ToneParameters) -> ToneParameters {
        let mut p = base;
        if let Some(v) = self.carrier { p.carrier_hz = v; }
        if let Some(v) = self.start_pulse { p.start_pulse_hz = v; }
        if let Some(v) = self.final_pulse { p.final_pulse_hz = v; }
        if let Some(v) = self.ramp { p.ramp_seconds = v; }
        if let Some(v) = self.volume { p.volume = v; }
        if let Some(v) = self.sample_rate { p.sample_rate = v; }
        if let Some(v) = self.buffer_size { p.buffer_size = v; }
        if self.no_ramp { p.use_ramp = false; }
        if self.no_vary { p.vary_randomly = false; }
        if let Some(v) = self.vary_min { p.vary_interval.0 = v; }
        if let Some(v) = self.vary_max { p.vary_interval.1 = v; }
        if let Some(v) = self.vary_amount { p.vary_amount_hz = v; }
        p
    }
}

pub fn read_config(path: &Path) -> Result<ToneParameters> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Config file (or defaults) with flag overrides, validated.
pub fn resolve_parameters(args: &PlayArgs) -> Result<ToneParameters> {
    let base = match &args.config {
        Some(path) => read_config(path)?,
        None => ToneParameters::default(),
    };
    let params = args.tone.apply(base);
    params.validate().context("invalid tone parameters")?;
    Ok(params)
}
