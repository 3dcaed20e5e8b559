//! Isotone Engine — pulse-rate control, playback lifecycle, audio backends.
//!
//! Crate layout:
//! - [`params`]     : `ToneParameters`, defaults, validation, presets
//! - [`controller`] : ramp + random retargeting with a sigmoid glide
//! - [`transport`]  : Stopped/Running/Paused state machine and timeline
//! - [`clock`]      : injectable time sources
//! - [`lifecycle`]  : keeps the transport and the open stream in step
//! - [`engine`]     : `AudioEngine` façade and `PulseProbe`
//! - [`monitor`]    : background pulse-rate poller for displays
//! - [`backend`]    : stream boundary, headless and CPAL implementations
//!
//! The audio callback locks one mutex, runs one controller step and one
//! synthesizer pass, and returns. Everything else happens on control threads.

pub mod backend;
pub mod clock;
pub mod controller;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod monitor;
pub mod params;
mod state;
pub mod transport;

pub use backend::{AudioBackend, ManualBackend, RenderCallback, StreamConfig, StreamHandle};
#[cfg(feature = "realtime")]
pub use backend::{output_device_names, CpalBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{FrequencyController, PulseUpdate, VariationState, TRANSITION_SECONDS};
pub use engine::{AudioEngine, PulseProbe};
pub use error::{EngineError, Result};
pub use lifecycle::PlaybackLifecycle;
pub use monitor::{PulseMonitor, DEFAULT_POLL_INTERVAL};
pub use params::{ToneParameters, SUPPORTED_BUFFER_SIZES, SUPPORTED_SAMPLE_RATES};
pub use state::PulseReading;
pub use transport::{PlaybackState, Transport};
