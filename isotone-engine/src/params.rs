//! Tone parameters supplied by the control surface.
//!
//! The engine reads these once per buffer. They are validated where they
//! enter the engine ([`ToneParameters::validate`]), so the render path can
//! treat them as trusted scalars.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Sample rates the control surface offers.
pub const SUPPORTED_SAMPLE_RATES: [u32; 7] = [8000, 16000, 22050, 44100, 48000, 96000, 192_000];

/// Buffer sizes (frames per callback) the control surface offers.
pub const SUPPORTED_BUFFER_SIZES: [u32; 6] = [1024, 2048, 4096, 8192, 16384, 32768];

/// Everything the synthesis core reads each buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneParameters {
    /// Carrier tone (Hz, > 0).
    pub carrier_hz: f64,
    /// Pulse rate at the start of the ramp (Hz).
    pub start_pulse_hz: f64,
    /// Pulse rate at the end of the ramp, and the centre of random variation (Hz).
    pub final_pulse_hz: f64,
    /// Ramp length in seconds (≥ 0).
    pub ramp_seconds: f64,
    /// Output gain in `[0, 1]`.
    pub volume: f64,
    /// Stream sample rate (Hz, > 0).
    pub sample_rate: u32,
    /// Frames per callback (> 0).
    pub buffer_size: u32,
    pub use_ramp: bool,
    pub vary_randomly: bool,
    /// Retarget interval bounds in seconds, `low ≤ high`.
    pub vary_interval: (f64, f64),
    /// Maximum deviation from `final_pulse_hz` when retargeting (± Hz, ≥ 0).
    pub vary_amount_hz: f64,
}

impl Default for ToneParameters {
    fn default() -> Self {
        Self {
            carrier_hz: 220.0,
            start_pulse_hz: 15.0,
            final_pulse_hz: 40.0,
            ramp_seconds: 180.0,
            volume: 0.5,
            sample_rate: 48_000,
            buffer_size: 4096,
            use_ramp: true,
            vary_randomly: true,
            vary_interval: (30.0, 60.0),
            vary_amount_hz: 1.0,
        }
    }
}

fn finite(field: &'static str, v: f64) -> Result<f64> {
    if v.is_finite() { Ok(v) } else { Err(EngineError::invalid(field, format!("must be finite, got {v}"))) }
}

impl ToneParameters {
    /// Reject anything the core can't synthesize sensibly.
    pub fn validate(&self) -> Result<()> {
        if finite("carrier_hz", self.carrier_hz)? <= 0.0 {
            return Err(EngineError::invalid("carrier_hz", "must be > 0"));
        }
        finite("start_pulse_hz", self.start_pulse_hz)?;
        finite("final_pulse_hz", self.final_pulse_hz)?;
        if finite("ramp_seconds", self.ramp_seconds)? < 0.0 {
            return Err(EngineError::invalid("ramp_seconds", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&finite("volume", self.volume)?) {
            return Err(EngineError::invalid("volume", "must be within [0, 1]"));
        }
        if self.sample_rate == 0 {
            return Err(EngineError::invalid("sample_rate", "must be > 0"));
        }
        if self.buffer_size == 0 {
            return Err(EngineError::invalid("buffer_size", "must be > 0"));
        }
        let (lo, hi) = self.vary_interval;
        if finite("vary_interval", lo)? < 0.0 || finite("vary_interval", hi)? < lo {
            return Err(EngineError::invalid(
                "vary_interval",
                format!("need 0 <= low <= high, got [{lo}, {hi}]"),
            ));
        }
        let amount = finite("vary_amount_hz", self.vary_amount_hz)?;
        if amount < 0.0 {
            return Err(EngineError::invalid("vary_amount_hz", "must be >= 0"));
        }
        let (below, above) = (self.final_pulse_hz - amount, self.final_pulse_hz + amount);
        if !(below.is_finite() && above.is_finite() && (above - below).is_finite()) {
            return Err(EngineError::invalid(
                "vary_amount_hz",
                format!("variation band around the final pulse overflows: {amount}"),
            ));
        }
        Ok(())
    }

    /// Whether the stream settings are among the offered presets.
    #[inline]
    pub fn uses_presets(&self) -> bool {
        SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate)
            && SUPPORTED_BUFFER_SIZES.contains(&self.buffer_size)
    }

    #[inline] pub fn sample_rate_hz(&self) -> f64 { f64::from(self.sample_rate) }
}
