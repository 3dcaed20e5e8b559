//! Headless backend: the host decides when buffers are pulled.
//!
//! Useful for tests, offline hosts and anything that wants the engine
//! without a sound card. Cloned handles share one stream slot, so a test can
//! keep a `ManualBackend` around after handing a clone to the engine and pump
//! the callback from there.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{AudioBackend, RenderCallback, StreamConfig, StreamHandle};
use crate::error::{EngineError, Result};

#[derive(Default)]
struct Slot {
    callback: Option<RenderCallback>,
    config: Option<StreamConfig>,
    playing: bool,
    opened: u64,
    fail_open: Option<String>,
    fail_start: Option<String>,
}

/// Backend whose callback runs only when [`pump`](Self::pump) is called.
#[derive(Clone, Default)]
pub struct ManualBackend {
    slot: Arc<Mutex<Slot>>,
}

impl ManualBackend {
    #[inline] pub fn new() -> Self { Self::default() }

    /// Make the next `open` fail with a device error.
    pub fn fail_next_open(&self, reason: impl Into<String>) { self.slot.lock().fail_open = Some(reason.into()); }

    /// Make the next `start` fail with a device error.
    pub fn fail_next_start(&self, reason: impl Into<String>) { self.slot.lock().fail_start = Some(reason.into()); }

    #[inline] pub fn is_open(&self) -> bool { self.slot.lock().callback.is_some() }
    #[inline] pub fn is_playing(&self) -> bool { self.slot.lock().playing }
    #[inline] pub fn config(&self) -> Option<StreamConfig> { self.slot.lock().config }

    /// Streams opened over this backend's lifetime.
    #[inline] pub fn open_count(&self) -> u64 { self.slot.lock().opened }

    /// Pull one buffer the way a playing device would. `None` unless a stream
    /// is open and started.
    pub fn pump(&self, frames: usize) -> Option<Vec<f32>> {
        let mut slot = self.slot.lock();
        if !slot.playing {
            return None;
        }
        let cb = slot.callback.as_mut()?;
        let mut buf = vec![0.0_f32; frames];
        cb(buf.as_mut_slice());
        Some(buf)
    }

    /// Pull one buffer even if the stream is stopped, mimicking a backend
    /// that keeps calling after a stop request. `None` only when closed.
    pub fn pump_regardless(&self, frames: usize) -> Option<Vec<f32>> {
        let mut slot = self.slot.lock();
        let cb = slot.callback.as_mut()?;
        let mut buf = vec![0.0_f32; frames];
        cb(buf.as_mut_slice());
        Some(buf)
    }
}

impl AudioBackend for ManualBackend {
    type Stream = ManualStream;

    fn open(&mut self, config: &StreamConfig, callback: RenderCallback) -> Result<ManualStream> {
        let mut slot = self.slot.lock();
        if let Some(reason) = slot.fail_open.take() {
            return Err(EngineError::Device(reason));
        }
        if slot.callback.is_some() {
            return Err(EngineError::Device("stream already open".into()));
        }
        slot.callback = Some(callback);
        slot.config = Some(*config);
        slot.playing = false;
        slot.opened += 1;
        Ok(ManualStream { slot: Arc::clone(&self.slot), config: *config, closed: false })
    }
}

/// Stream handle for [`ManualBackend`].
pub struct ManualStream {
    slot: Arc<Mutex<Slot>>,
    config: StreamConfig,
    closed: bool,
}

impl ManualStream {
    fn release(&mut self) {
        if self.closed {
            return;
        }
        let mut slot = self.slot.lock();
        slot.callback = None;
        slot.config = None;
        slot.playing = false;
        self.closed = true;
    }
}

impl StreamHandle for ManualStream {
    #[inline] fn config(&self) -> StreamConfig { self.config }

    fn start(&mut self) -> Result<()> {
        let mut slot = self.slot.lock();
        if let Some(reason) = slot.fail_start.take() {
            return Err(EngineError::Device(reason));
        }
        slot.playing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.slot.lock().playing = false;
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for ManualStream {
    fn drop(&mut self) { self.release(); }
}
