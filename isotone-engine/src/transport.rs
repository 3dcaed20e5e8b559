//! Playback transport: the Stopped/Running/Paused state machine and its
//! timeline.
//!
//! This is pure bookkeeping. It knows nothing about streams; the lifecycle
//! drives it and the render path reads it. Logical time freezes while paused:
//! the paused span is folded into `pause_offset` on resume, and `elapsed`
//! pins "now" to the pause instant in between.

use std::time::Duration;

use crate::clock::elapsed;
use crate::error::{EngineError, Result};

/// Where playback stands.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl PlaybackState {
    #[inline] pub fn is_stopped(self) -> bool { self == Self::Stopped }
    #[inline] pub fn is_running(self) -> bool { self == Self::Running }
    #[inline] pub fn is_paused(self) -> bool { self == Self::Paused }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        })
    }
}

/// State machine plus timestamps (all on the engine clock).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Transport {
    state: PlaybackState,
    started_at: Duration,
    paused_at: Option<Duration>,
    pause_offset: Duration,
}

impl Transport {
    #[inline] pub fn new() -> Self { Self::default() }
    #[inline] pub fn state(&self) -> PlaybackState { self.state }
    #[inline] pub fn pause_offset(&self) -> Duration { self.pause_offset }

    /// Stopped → Running, timeline restarts at `now`.
    pub fn start(&mut self, now: Duration) -> Result<()> {
        if !self.state.is_stopped() {
            return Err(EngineError::InvalidTransition { from: self.state, action: "start" });
        }
        *self = Self { state: PlaybackState::Running, started_at: now, paused_at: None, pause_offset: Duration::ZERO };
        Ok(())
    }

    /// Running → Paused. Returns `false` if already paused.
    pub fn pause(&mut self, now: Duration) -> Result<bool> {
        match self.state {
            PlaybackState::Running => {
                self.state = PlaybackState::Paused;
                self.paused_at = Some(now);
                Ok(true)
            }
            PlaybackState::Paused => Ok(false),
            PlaybackState::Stopped => Err(EngineError::InvalidTransition { from: self.state, action: "pause" }),
        }
    }

    /// Paused → Running, skipping the paused span. Returns `false` if already running.
    pub fn resume(&mut self, now: Duration) -> Result<bool> {
        match self.state {
            PlaybackState::Paused => {
                if let Some(at) = self.paused_at.take() {
                    self.pause_offset += now.saturating_sub(at);
                }
                self.state = PlaybackState::Running;
                Ok(true)
            }
            PlaybackState::Running => Ok(false),
            PlaybackState::Stopped => Err(EngineError::InvalidTransition { from: self.state, action: "resume" }),
        }
    }

    /// Anything → Stopped. Returns `false` if it already was.
    pub fn stop(&mut self) -> bool {
        let was_live = !self.state.is_stopped();
        *self = Self::default();
        was_live
    }

    /// Logical playback seconds at `now`. Zero while stopped.
    #[inline]
    pub fn elapsed(&self, now: Duration) -> f64 {
        match (self.state, self.paused_at) {
            (PlaybackState::Stopped, _) => 0.0,
            (PlaybackState::Paused, Some(at)) => elapsed(at, self.started_at, self.pause_offset),
            _ => elapsed(now, self.started_at, self.pause_offset),
        }
    }
}
