//! Playback lifecycle: keeps the transport and the open stream in step.
//!
//! Invariant: a stream is held exactly when the transport is not Stopped.
//!
//! Lock discipline: the engine mutex guards the transport and synthesis
//! state, and the render callback takes it once per buffer. Stream
//! start/stop/close may wait for an in-flight callback, so they only ever run
//! after the guard has been released.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::backend::{AudioBackend, RenderCallback, StreamConfig, StreamHandle};
use crate::clock::Clock;
use crate::error::{EngineError, Result};
use crate::state::EngineState;
use crate::transport::PlaybackState;

/// Owns the backend and the stream handle; drives the shared transport.
pub struct PlaybackLifecycle<B: AudioBackend> {
    backend: B,
    stream: Option<B::Stream>,
    shared: Arc<Mutex<EngineState>>,
    clock: Arc<dyn Clock>,
}

impl<B: AudioBackend> PlaybackLifecycle<B> {
    pub(crate) fn new(backend: B, shared: Arc<Mutex<EngineState>>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, stream: None, shared, clock }
    }

    #[inline] pub fn state(&self) -> PlaybackState { self.shared.lock().transport.state() }
    #[inline] pub fn has_stream(&self) -> bool { self.stream.is_some() }
    #[inline] pub fn backend(&self) -> &B { &self.backend }

    /// The stream's configuration, if one is open.
    pub fn stream_config(&self) -> Option<StreamConfig> { self.stream.as_ref().map(StreamHandle::config) }

    fn render_callback(&self) -> RenderCallback {
        let shared = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.clock);
        Box::new(move |out: &mut [f32]| {
            let now = clock.now();
            shared.lock().render(now, out);
        })
    }

    /// Stopped → Running: fresh phase and variation, open and start a stream.
    ///
    /// On any device failure the transport is back at Stopped and no stream
    /// is held when this returns.
    pub fn start(&mut self) -> Result<()> {
        let requested = {
            let mut st = self.shared.lock();
            let from = st.transport.state();
            if !from.is_stopped() {
                return Err(EngineError::InvalidTransition { from, action: "start" });
            }
            st.prepare();
            StreamConfig::mono(st.params.sample_rate, st.params.buffer_size)
        };

        let mut stream = match self.backend.open(&requested, self.render_callback()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "could not open output stream");
                return Err(e);
            }
        };
        let actual = stream.config();

        {
            let mut st = self.shared.lock();
            st.stream_rate = f64::from(actual.sample_rate);
            st.transport.start(self.clock.now())?;
        }

        if let Err(e) = stream.start() {
            self.shared.lock().transport.stop();
            if let Err(close_err) = stream.close() {
                warn!(error = %close_err, "closing a stream that failed to start");
            }
            error!(error = %e, "could not start output stream");
            return Err(e);
        }

        self.stream = Some(stream);
        info!(sample_rate = actual.sample_rate, frames = actual.frames_per_buffer, "playback started");
        Ok(())
    }

    /// Running → Paused. The callback goes silent as soon as the transport
    /// flips; the stream is then stopped but kept open.
    ///
    /// Returns `false` if already paused.
    pub fn pause(&mut self) -> Result<bool> {
        let now = self.clock.now();
        let changed = self.shared.lock().transport.pause(now)?;
        if changed {
            if let Some(stream) = self.stream.as_mut() {
                if let Err(e) = stream.stop() {
                    warn!(error = %e, "stream refused to stop; callback stays silent while paused");
                }
            }
            info!("playback paused");
        }
        Ok(changed)
    }

    /// Paused → Running. A stream that won't restart takes the whole
    /// lifecycle down to Stopped.
    ///
    /// Returns `false` if already running.
    pub fn resume(&mut self) -> Result<bool> {
        let now = self.clock.now();
        if !self.shared.lock().transport.resume(now)? {
            return Ok(false);
        }
        let restarted = match self.stream.as_mut() {
            Some(stream) => stream.start(),
            None => Err(EngineError::Device("no open stream to resume".into())),
        };
        if let Err(e) = restarted {
            error!(error = %e, "could not restart output stream");
            self.stop();
            return Err(e);
        }
        info!("playback resumed");
        Ok(true)
    }

    /// Anything → Stopped, closing the stream. No callback runs once this
    /// returns. Returns `false` if nothing was playing.
    pub fn stop(&mut self) -> bool {
        let was_live = self.shared.lock().transport.stop();
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                warn!(error = %e, "stream stop failed during shutdown");
            }
            if let Err(e) = stream.close() {
                warn!(error = %e, "stream close failed");
            }
        }
        if was_live {
            info!("playback stopped");
        }
        was_live
    }
}

impl<B: AudioBackend> Drop for PlaybackLifecycle<B> {
    fn drop(&mut self) { self.stop(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ManualBackend;
    use crate::clock::ManualClock;
    use crate::params::ToneParameters;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lifecycle() -> (PlaybackLifecycle<ManualBackend>, ManualBackend, Arc<ManualClock>) {
        let backend = ManualBackend::new();
        let clock = Arc::new(ManualClock::new());
        let shared = Arc::new(Mutex::new(EngineState::new(ToneParameters::default(), StdRng::seed_from_u64(2))));
        (PlaybackLifecycle::new(backend.clone(), shared, clock.clone()), backend, clock)
    }

    #[test]
    fn stream_held_iff_not_stopped() {
        let (mut lc, backend, _clock) = lifecycle();
        assert!(!lc.has_stream());
        lc.start().unwrap();
        assert!(lc.has_stream() && backend.is_playing());
        assert!(lc.pause().unwrap());
        assert!(lc.has_stream() && backend.is_open() && !backend.is_playing());
        assert!(lc.resume().unwrap());
        assert!(backend.is_playing());
        assert!(lc.stop());
        assert!(!lc.has_stream() && !backend.is_open());
        assert_eq!(lc.state(), PlaybackState::Stopped);
    }

    #[test]
    fn start_requests_parameter_shape() {
        let (mut lc, backend, _clock) = lifecycle();
        lc.start().unwrap();
        assert_eq!(backend.config(), Some(StreamConfig::mono(48_000, 4096)));
        assert_eq!(lc.stream_config(), Some(StreamConfig::mono(48_000, 4096)));
    }

    #[test]
    fn open_failure_leaves_nothing_behind() {
        let (mut lc, backend, _clock) = lifecycle();
        backend.fail_next_open("unplugged");
        assert_eq!(lc.start(), Err(EngineError::Device("unplugged".into())));
        assert_eq!(lc.state(), PlaybackState::Stopped);
        assert!(!lc.has_stream());
    }

    #[test]
    fn start_failure_closes_the_opened_stream() {
        let (mut lc, backend, _clock) = lifecycle();
        backend.fail_next_start("busy");
        assert!(lc.start().is_err());
        assert_eq!(lc.state(), PlaybackState::Stopped);
        assert!(!lc.has_stream());
        assert!(!backend.is_open());
        lc.start().unwrap();
        assert_eq!(backend.open_count(), 2);
    }

    #[test]
    fn resume_failure_falls_back_to_stopped() {
        let (mut lc, backend, _clock) = lifecycle();
        lc.start().unwrap();
        lc.pause().unwrap();
        backend.fail_next_start("device vanished");
        assert!(lc.resume().is_err());
        assert_eq!(lc.state(), PlaybackState::Stopped);
        assert!(!backend.is_open());
    }

    #[test]
    fn start_while_live_is_rejected() {
        let (mut lc, _backend, _clock) = lifecycle();
        lc.start().unwrap();
        assert!(matches!(lc.start(), Err(EngineError::InvalidTransition { from: PlaybackState::Running, .. })));
        assert!(lc.has_stream());
    }

    #[test]
    fn callback_reads_the_shared_clock() {
        let (mut lc, backend, clock) = lifecycle();
        lc.start().unwrap();
        clock.advance_secs(90.0);
        backend.pump(16).unwrap();
        let pulse = lc.shared.lock().variation().current_hz;
        assert!((pulse - 27.5).abs() < 1e-9, "pulse={pulse}");
    }
}
