//! State shared between the control side and the audio callback.
//!
//! Everything the callback touches lives in one [`EngineState`] behind one
//! `parking_lot::Mutex`. The callback's critical section is a single call to
//! [`EngineState::render`]: one controller step, one synthesizer pass, one
//! phase advance. No allocation, no logging, no syscalls.

use std::time::Duration;

use isotone_core::phase::PhaseState;
use isotone_core::synth::ToneSynthesizer;
use rand::rngs::StdRng;

use crate::controller::{FrequencyController, VariationState};
use crate::params::ToneParameters;
use crate::transport::{PlaybackState, Transport};

/// Snapshot of what is sounding, for display polling.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PulseReading {
    pub state: PlaybackState,
    /// Pulse rate currently sounding (Hz).
    pub pulse_hz: f64,
    /// Where the pulse rate is heading (Hz).
    pub target_hz: f64,
    /// Logical playback time (seconds, pauses excluded).
    pub elapsed: f64,
    /// Retargets since start.
    pub retargets: u64,
}

pub(crate) struct EngineState {
    pub(crate) params: ToneParameters,
    pub(crate) phase: PhaseState,
    pub(crate) controller: FrequencyController<StdRng>,
    pub(crate) transport: Transport,
    /// Sample rate of the open stream; latched when the stream opens.
    pub(crate) stream_rate: f64,
}

impl EngineState {
    pub(crate) fn new(params: ToneParameters, rng: StdRng) -> Self {
        let controller = FrequencyController::new(&params, rng);
        let stream_rate = params.sample_rate_hz();
        Self { params, phase: PhaseState::new(), controller, transport: Transport::new(), stream_rate }
    }

    /// Fresh phase and variation state for a new stream.
    pub(crate) fn prepare(&mut self) {
        self.phase.reset();
        self.controller.reset(&self.params);
        self.stream_rate = self.params.sample_rate_hz();
    }

    /// Produce one callback's worth of audio into `out`.
    ///
    /// Anything but Running yields silence and leaves phase and variation
    /// state exactly as they were.
    pub(crate) fn render(&mut self, now: Duration, out: &mut [f32]) {
        if !self.transport.state().is_running() {
            out.fill(0.0);
            return;
        }
        let t = self.transport.elapsed(now);
        let pulse = self.controller.update(t, &self.params);
        let synth = ToneSynthesizer::new(self.params.carrier_hz, pulse.current_hz, self.stream_rate, self.params.volume);
        self.phase = synth.render_into(out, self.phase);
    }

    #[inline] pub(crate) fn variation(&self) -> &VariationState { self.controller.state() }

    pub(crate) fn reading(&self, now: Duration) -> PulseReading {
        let v = self.variation();
        PulseReading {
            state: self.transport.state(),
            pulse_hz: v.current_hz,
            target_hz: v.target_hz,
            elapsed: self.transport.elapsed(now),
            retargets: v.retargets,
        }
    }
}
