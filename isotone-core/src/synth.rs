//! Isochronic tone renderer.
//!
//! One block of output is a sine carrier multiplied by a raised-sine pulse
//! envelope:
//!
//! `y[i] = sin(2π·fc·i/sr + φc) · (sin(2π·fp·i/sr + φp) + 1)/2 · volume`
//!
//! The renderer is a pure function of its inputs. It never allocates on the
//! slice path, which is the one the audio callback uses. Frequencies are held
//! constant over the block; the caller decides them once per buffer.

use crate::dsp::{clamp, m_sin, TAU};
use crate::phase::PhaseState;

/// Per-block synthesis parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ToneSynthesizer {
    /// Audible carrier tone (Hz).
    pub carrier_hz: f64,
    /// Envelope rate (Hz).
    pub pulse_hz: f64,
    /// Output sample rate (Hz).
    pub sample_rate: f64,
    /// Linear output gain, clamped to `[0, 1]` when rendering.
    pub volume: f64,
}

impl ToneSynthesizer {
    #[inline]
    pub fn new(carrier_hz: f64, pulse_hz: f64, sample_rate: f64, volume: f64) -> Self {
        Self { carrier_hz, pulse_hz, sample_rate, volume }
    }

    /// Closed-form value of sample `i` of a block starting at `phase`.
    #[inline]
    pub fn sample_at(&self, i: usize, phase: PhaseState) -> f64 {
        let t = i as f64 / self.sample_rate;
        let carrier = m_sin(TAU * self.carrier_hz * t + phase.carrier);
        let envelope = 0.5 * (m_sin(TAU * self.pulse_hz * t + phase.pulse) + 1.0);
        carrier * envelope * clamp(self.volume, 0.0, 1.0)
    }

    /// Fill `out` with `out.len()` frames starting at `phase` and return the
    /// phases for the next block.
    ///
    /// Every sample lies in `[-volume, volume]`. A non-positive sample rate
    /// produces silence and leaves the phases untouched.
    #[allow(clippy::cast_possible_truncation)]
    pub fn render_into(&self, out: &mut [f32], phase: PhaseState) -> PhaseState {
        if self.sample_rate <= 0.0 {
            out.fill(0.0);
            return phase;
        }
        for (i, y) in out.iter_mut().enumerate() {
            *y = self.sample_at(i, phase) as f32;
        }
        phase.advanced(self.carrier_hz, self.pulse_hz, out.len(), self.sample_rate)
    }

    /// Allocating convenience wrapper around [`render_into`](Self::render_into).
    #[cfg(feature = "std")]
    pub fn render(&self, frame_count: usize, phase: PhaseState) -> (Vec<f32>, PhaseState) {
        let mut buf = vec![0.0_f32; frame_count];
        let next = self.render_into(&mut buf, phase);
        (buf, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_length_and_bounds() {
        for (frames, vol) in [(1usize, 1.0), (1024, 0.5), (4096, 0.25), (32768, 0.9), (0, 0.5)] {
            let synth = ToneSynthesizer::new(440.0, 12.0, 44_100.0, vol);
            let (buf, _) = synth.render(frames, PhaseState { carrier: 1.0, pulse: 4.0 });
            assert_eq!(buf.len(), frames);
            let bound = vol as f32;
            assert!(buf.iter().all(|s| s.abs() <= bound), "sample above volume {vol}");
        }
    }

    #[test]
    fn matches_closed_form_and_phase_math() {
        let synth = ToneSynthesizer::new(220.0, 15.0, 48_000.0, 0.5);
        let (buf, next) = synth.render(4096, PhaseState::new());
        for (i, &s) in buf.iter().enumerate() {
            let t = i as f64 / 48_000.0;
            let expected = (TAU * 220.0 * t).sin() * ((TAU * 15.0 * t).sin() + 1.0) / 2.0 * 0.5;
            assert!((f64::from(s) - expected).abs() < 1e-6, "i={i} s={s} expected={expected}");
        }
        let want_c = (TAU * 220.0 * 4096.0 / 48_000.0) % TAU;
        let want_p = (TAU * 15.0 * 4096.0 / 48_000.0) % TAU;
        assert!((next.carrier - want_c).abs() < 1e-9);
        assert!((next.pulse - want_p).abs() < 1e-9);
    }

    #[test]
    fn blocks_join_without_discontinuity() {
        // Two 512-frame blocks must equal one 1024-frame block.
        let synth = ToneSynthesizer::new(331.0, 7.3, 48_000.0, 0.8);
        let (whole, _) = synth.render(1024, PhaseState::new());
        let (a, mid) = synth.render(512, PhaseState::new());
        let (b, _) = synth.render(512, mid);
        for (i, (x, y)) in whole.iter().zip(a.iter().chain(b.iter())).enumerate() {
            assert!((x - y).abs() < 1e-5, "i={i} whole={x} split={y}");
        }
    }

    #[test]
    fn zero_volume_is_silent() {
        let synth = ToneSynthesizer::new(220.0, 10.0, 48_000.0, 0.0);
        let (buf, _) = synth.render(256, PhaseState::new());
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn invalid_sample_rate_renders_silence() {
        let synth = ToneSynthesizer::new(220.0, 10.0, 0.0, 1.0);
        let start = PhaseState { carrier: 0.3, pulse: 0.7 };
        let mut buf = [1.0_f32; 64];
        let next = synth.render_into(&mut buf, start);
        assert!(buf.iter().all(|&s| s == 0.0));
        assert_eq!(next, start);
    }
}
