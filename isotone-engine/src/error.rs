//! Engine error taxonomy.

use crate::transport::PlaybackState;

/// Errors surfaced to the control surface.
///
/// Nothing here is ever produced on the audio thread; the render path turns
/// every fault into silence instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// The audio backend could not open, start or stop a stream.
    #[error("audio device error: {0}")]
    Device(String),

    /// A parameter failed validation at the setter boundary.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter {
        field: &'static str,
        reason: String,
    },

    /// A transport command that makes no sense from the current state.
    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        from: PlaybackState,
        action: &'static str,
    },
}

impl EngineError {
    #[inline]
    pub(crate) fn device(e: impl std::fmt::Display) -> Self {
        Self::Device(e.to_string())
    }

    #[inline]
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { field, reason: reason.into() }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
