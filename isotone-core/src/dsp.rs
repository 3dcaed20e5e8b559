//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Clean, side-effect free helpers that are easy to test
//!
//! Conventions:
//! - Everything here works in `f64`. Phase and time accumulate over hours of
//!   playback, so the extra mantissa is worth more than the SIMD width.
//! - Argument and return domains are documented per function.

use core::f64::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // std backend
    if #[cfg(feature = "std")] {
        #[inline] pub(crate) fn m_sin(x: f64) -> f64 { x.sin() }
        #[inline] pub(crate) fn m_exp(x: f64) -> f64 { x.exp() }
        #[inline] pub(crate) fn m_floor(x: f64) -> f64 { x.floor() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] pub(crate) fn m_sin(x: f64) -> f64 { libm::sin(x) }
        #[inline] pub(crate) fn m_exp(x: f64) -> f64 { libm::exp(x) }
        #[inline] pub(crate) fn m_floor(x: f64) -> f64 { libm::floor(x) }
    } else {
        compile_error!("isotone-core needs either the `std` or the `no-std` feature");
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (one full oscillator cycle in radians)
pub const TAU: f64 = 2.0 * PI;

/// Steepness of the logistic transition curve. Higher is sharper around the midpoint.
pub const SIGMOID_STEEPNESS: f64 = 10.0;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Wrap a phase in radians into `[0, 2π)`.
///
/// Works for any finite input, including negatives and values many cycles out.
/// Non-finite input collapses to `0.0` so a bad frequency can't poison the
/// accumulator forever.
#[inline]
pub fn wrap_phase(p: f64) -> f64 {
    let w = p - TAU * m_floor(p / TAU);
    // floor() can leave w == TAU (or a hair below 0) through rounding
    if !w.is_finite() || !(0.0..TAU).contains(&w) { 0.0 } else { w }
}

/// Logistic ease over `progress` in `[0, 1]`:
/// `1 / (1 + exp(-k * (progress - 0.5)))` with `k = SIGMOID_STEEPNESS`.
///
/// Input is clamped first, so the result always sits in `(0, 1)` and rises
/// monotonically. It is ≈0.0067 at 0, exactly 0.5 at the midpoint and ≈0.9933 at 1.
#[inline]
pub fn sigmoid_ease(progress: f64) -> f64 {
    let p = clamp(progress, 0.0, 1.0);
    1.0 / (1.0 + m_exp(-SIGMOID_STEEPNESS * (p - 0.5)))
}

// --------------------------------- Tests (std only) ------------------------------
