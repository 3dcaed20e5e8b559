//! Periodic pulse-rate poller for status displays.
//!
//! Runs on its own thread, reads a [`PulseProbe`] every `interval` and hands
//! the reading to a sink while the engine is Running. Paused and stopped
//! engines are skipped so a display keeps its last value.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::debug;

use crate::engine::PulseProbe;
use crate::error::{EngineError, Result};
use crate::state::PulseReading;

/// Poll period used by [`PulseMonitor::spawn_default`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to a running poller. Dropping it stops and joins the thread.
pub struct PulseMonitor {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PulseMonitor {
    /// Poll `probe` every `interval`, calling `sink` with each Running reading.
    pub fn spawn<F>(probe: PulseProbe, interval: Duration, mut sink: F) -> Result<Self>
    where
        F: FnMut(PulseReading) + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("isotone-monitor".into())
            .spawn(move || {
                let mut last_retargets = 0;
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let reading = probe.reading();
                    if !reading.state.is_running() {
                        continue;
                    }
                    if reading.retargets != last_retargets {
                        debug!(target_hz = reading.target_hz, elapsed = reading.elapsed, "pulse retargeted");
                        last_retargets = reading.retargets;
                    }
                    sink(reading);
                }
            })
            .map_err(EngineError::device)?;
        Ok(Self { stop_tx: Some(stop_tx), handle: Some(handle) })
    }

    /// [`spawn`](Self::spawn) at [`DEFAULT_POLL_INTERVAL`].
    pub fn spawn_default<F>(probe: PulseProbe, sink: F) -> Result<Self>
    where
        F: FnMut(PulseReading) + Send + 'static,
    {
        Self::spawn(probe, DEFAULT_POLL_INTERVAL, sink)
    }

    /// Stop polling and wait for the thread to finish.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for PulseMonitor {
    fn drop(&mut self) { self.stop(); }
}
