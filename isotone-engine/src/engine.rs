//! `AudioEngine`: the control-surface façade.
//!
//! One engine drives one tone stream. The control thread owns the engine;
//! the backend's callback thread and any number of display pollers
//! ([`PulseProbe`]) share its synthesis state through a single mutex.
//!
//! ```no_run
//! use isotone_engine::{AudioEngine, ManualBackend, ToneParameters};
//!
//! let backend = ManualBackend::new();
//! let mut engine = AudioEngine::new(backend.clone());
//! engine.set_parameters(ToneParameters { carrier_hz: 200.0, ..Default::default() })?;
//! engine.start()?;
//! let block = backend.pump(4096);
//! engine.stop();
//! # Ok::<(), isotone_engine::EngineError>(())
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::backend::AudioBackend;
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::lifecycle::PlaybackLifecycle;
use crate::params::ToneParameters;
use crate::state::{EngineState, PulseReading};
use crate::transport::PlaybackState;

/// Isochronic tone engine over some audio backend.
pub struct AudioEngine<B: AudioBackend> {
    lifecycle: PlaybackLifecycle<B>,
    shared: Arc<Mutex<EngineState>>,
    clock: Arc<dyn Clock>,
}

impl<B: AudioBackend> AudioEngine<B> {
    /// Engine with default parameters, the system clock and an entropy-seeded RNG.
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock::new()), None)
    }

    /// Engine on an explicit clock. `seed` fixes the variation RNG so a run
    /// can be replayed.
    pub fn with_clock(backend: B, clock: Arc<dyn Clock>, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let shared = Arc::new(Mutex::new(EngineState::new(ToneParameters::default(), rng)));
        let lifecycle = PlaybackLifecycle::new(backend, Arc::clone(&shared), Arc::clone(&clock));
        Self { lifecycle, shared, clock }
    }

    // ---- Transport ----

    /// Begin playback. From Paused this resumes; from Running it does nothing.
    pub fn start(&mut self) -> Result<()> {
        match self.state() {
            PlaybackState::Stopped => self.lifecycle.start(),
            PlaybackState::Paused => self.lifecycle.resume().map(drop),
            PlaybackState::Running => Ok(()),
        }
    }

    /// Freeze playback, keeping phase, variation and the stream. A second
    /// pause is a no-op; pausing while stopped is an error.
    pub fn pause(&mut self) -> Result<()> { self.lifecycle.pause().map(drop) }

    /// Continue from where `pause` left off. No-op while running.
    pub fn resume(&mut self) -> Result<()> { self.lifecycle.resume().map(drop) }

    /// Stop and release the stream. Safe from any state, any number of times.
    pub fn stop(&mut self) { self.lifecycle.stop(); }

    // ---- Parameters ----

    /// Replace the tone parameters. Rejected values leave the current ones
    /// untouched. Sample rate and buffer size apply from the next `start`;
    /// everything else is picked up by the next buffer.
    pub fn set_parameters(&mut self, params: ToneParameters) -> Result<()> {
        params.validate()?;
        let mut st = self.shared.lock();
        let stream_changed = st.params.sample_rate != params.sample_rate || st.params.buffer_size != params.buffer_size;
        if stream_changed && !st.transport.state().is_stopped() {
            info!(
                sample_rate = params.sample_rate,
                buffer_size = params.buffer_size,
                "stream settings changed; they apply on the next start"
            );
        }
        st.params = params;
        Ok(())
    }

    pub fn parameters(&self) -> ToneParameters { self.shared.lock().params.clone() }

    // ---- Queries ----

    #[inline] pub fn state(&self) -> PlaybackState { self.lifecycle.state() }
    #[inline] pub fn has_stream(&self) -> bool { self.lifecycle.has_stream() }
    #[inline] pub fn backend(&self) -> &B { self.lifecycle.backend() }

    /// Pulse rate most recently used for synthesis (Hz). After a stop this
    /// is the last value that sounded.
    pub fn current_pulse_frequency(&self) -> f64 { self.shared.lock().variation().current_hz }

    pub fn reading(&self) -> PulseReading { self.shared.lock().reading(self.clock.now()) }

    /// Render one buffer synchronously, exactly as the stream callback would.
    /// Silent unless Running.
    pub fn render_buffer(&self, out: &mut [f32]) {
        let now = self.clock.now();
        self.shared.lock().render(now, out);
    }

    /// Cheap, thread-safe read handle for display polling.
    pub fn probe(&self) -> PulseProbe {
        PulseProbe { shared: Arc::clone(&self.shared), clock: Arc::clone(&self.clock) }
    }
}

/// Read-only view of a running engine, safe to move to other threads.
#[derive(Clone)]
pub struct PulseProbe {
    shared: Arc<Mutex<EngineState>>,
    clock: Arc<dyn Clock>,
}

impl PulseProbe {
    pub fn current_pulse_frequency(&self) -> f64 { self.shared.lock().variation().current_hz }
    pub fn reading(&self) -> PulseReading { self.shared.lock().reading(self.clock.now()) }
}

impl std::fmt::Debug for PulseProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseProbe").field("reading", &self.reading()).finish()
    }
}
