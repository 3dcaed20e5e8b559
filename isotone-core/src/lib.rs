#![cfg_attr(not(feature = "std"), no_std)]
//! Isotone Core — no_std-ready DSP primitives for isochronic tone synthesis.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm` for the math backend
//!
//! Modules
//! - [`dsp`]   : math backend, phase wrap, logistic ease, small helpers
//! - [`phase`] : carrier/pulse phase accumulators
//! - [`synth`] : block renderer for the pulsed carrier
//!
//! Design
//! - No heap allocations on the render path
//! - Pure functions of their inputs; all state is passed in and handed back
//! - Friendly to embedded / real-time targets

pub mod dsp;
pub mod phase;
pub mod synth;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{clamp, lerp, sigmoid_ease, wrap_phase, SIGMOID_STEEPNESS, TAU};
    pub use crate::phase::{advance, PhaseState};
    pub use crate::synth::ToneSynthesizer;
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let _ = sigmoid_ease(0.25);
        let next = advance(0.0, 10.0, 4800, 48_000.0);
        assert!((next - TAU).abs() < 1e-9 || next < 1e-9);
        let synth = ToneSynthesizer::new(220.0, 10.0, 48_000.0, 0.5);
        let _ = synth.render(16, PhaseState::new());
    }
}
