//! Audio backend boundary.
//!
//! The engine never talks to a sound API directly. It asks an
//! [`AudioBackend`] to open a mono f32 stream driven by a [`RenderCallback`]
//! and gets back a [`StreamHandle`] it can start, stop and close.
//!
//! - [`ManualBackend`] : headless; the host pumps the callback by hand
//! - `CpalBackend`     : real output device via CPAL (feature `realtime`)

use crate::error::Result;

mod manual;
pub use manual::{ManualBackend, ManualStream};

#[cfg(feature = "realtime")]
mod device;
#[cfg(feature = "realtime")]
pub use device::{output_device_names, CpalBackend, CpalStream};

/// Pull callback handed to the backend. Fills the slice with mono samples in
/// `[-1, 1]`; one call per hardware buffer.
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Stream shape. The synthesized signal is always mono; a device adapter may
/// fan it out to however many channels the hardware wants.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames_per_buffer: u32,
}

impl StreamConfig {
    #[inline]
    pub fn mono(sample_rate: u32, frames_per_buffer: u32) -> Self {
        Self { sample_rate, channels: 1, frames_per_buffer }
    }
}

/// Something that can open output streams.
pub trait AudioBackend {
    type Stream: StreamHandle;

    /// Open (but don't start) a stream that will call `callback` for audio.
    fn open(&mut self, config: &StreamConfig, callback: RenderCallback) -> Result<Self::Stream>;
}

/// An open output stream.
pub trait StreamHandle {
    /// The configuration the backend actually settled on.
    fn config(&self) -> StreamConfig;

    /// Begin (or continue) invoking the callback.
    fn start(&mut self) -> Result<()>;

    /// Stop invoking the callback; the stream stays open.
    fn stop(&mut self) -> Result<()>;

    /// Release the stream. No callback runs after this returns.
    fn close(self) -> Result<()>;
}
