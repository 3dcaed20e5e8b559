//! Phase accumulators for the carrier and pulse oscillators.
//!
//! Phases are kept in radians and wrapped into `[0, 2π)` after every block, so
//! the accumulator never grows without bound and loses precision. Carrying the
//! phase from one block to the next keeps the waveform continuous across
//! buffer boundaries (no click at the edge of every callback).

use crate::dsp::{wrap_phase, TAU};

/// Advance `phase` by `frame_count` samples of a `frequency_hz` oscillator.
///
/// Returns `(phase + 2π·f·n/sr) mod 2π`. A zero frequency leaves the phase
/// where it is; a non-positive `sample_rate` is treated as "no time passed".
#[inline]
pub fn advance(phase: f64, frequency_hz: f64, frame_count: usize, sample_rate: f64) -> f64 {
    if sample_rate <= 0.0 {
        return wrap_phase(phase);
    }
    wrap_phase(phase + TAU * frequency_hz * frame_count as f64 / sample_rate)
}

/// Carrier + pulse phase pair carried between buffers.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PhaseState {
    /// Carrier oscillator phase, radians in `[0, 2π)`.
    pub carrier: f64,
    /// Pulse (envelope) oscillator phase, radians in `[0, 2π)`.
    pub pulse: f64,
}

impl PhaseState {
    #[inline] pub fn new() -> Self { Self::default() }
    #[inline] pub fn reset(&mut self) { *self = Self::default(); }

    /// Advance both phases by one block.
    #[inline]
    #[must_use]
    pub fn advanced(self, carrier_hz: f64, pulse_hz: f64, frame_count: usize, sample_rate: f64) -> Self {
        Self {
            carrier: advance(self.carrier, carrier_hz, frame_count, sample_rate),
            pulse: advance(self.pulse, pulse_hz, frame_count, sample_rate),
        }
    }
}
