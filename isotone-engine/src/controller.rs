//! Pulse-rate controller: linear ramp, then random retargeting with a
//! logistic glide.
//!
//! Evaluated once per audio buffer with the logical playback time `t`
//! (seconds since start, paused spans excluded):
//!
//! 1. While the ramp runs (`use_ramp && t <= ramp_seconds`) the pulse rate is
//!    interpolated linearly from `start_pulse_hz` to `final_pulse_hz`.
//! 2. Afterwards, if random variation is on and the current interval has
//!    expired, a new target `final ± U(0, amount)` is drawn and a fresh
//!    interval is picked from `vary_interval`.
//! 3. For [`TRANSITION_SECONDS`] after a retarget the sounding rate glides
//!    toward the target with [`sigmoid_ease`]; after that it holds the target.
//!
//! The controller owns its RNG so tests can seed it and predict every draw.
//! It never allocates and never logs; it runs under the engine lock.

use isotone_core::dsp::{clamp, lerp, sigmoid_ease};
use rand::Rng;

use crate::params::ToneParameters;

/// Length of the glide after every retarget (seconds).
pub const TRANSITION_SECONDS: f64 = 3.0;

/// Mutable retargeting state. Lives from `start` to `stop`, survives pauses.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VariationState {
    /// Pulse rate actually sounding (Hz).
    pub current_hz: f64,
    /// Where the glide is heading (Hz).
    pub target_hz: f64,
    /// Logical time the current glide began.
    pub transition_start: f64,
    /// Logical time of the last retarget.
    pub last_change: f64,
    /// Seconds until the next retarget is due, counted from `last_change`.
    pub change_interval: f64,
    /// Number of retargets since start.
    pub retargets: u64,
}

/// Result of one controller step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PulseUpdate {
    pub current_hz: f64,
    pub target_hz: f64,
    /// A new target was drawn on this step.
    pub retargeted: bool,
}

/// Uniform draw from `[lo, hi]`. A collapsed range returns `lo` without
/// touching the RNG, so fixed intervals keep the draw sequence predictable.
/// A span too wide to represent also returns `lo`; `gen_range` would panic.
#[inline]
fn uniform<R: Rng>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo && (hi - lo).is_finite() { rng.gen_range(lo..=hi) } else { lo }
}

/// Computes the pulse rate for the next buffer.
#[derive(Clone, Debug)]
pub struct FrequencyController<R> {
    state: VariationState,
    rng: R,
}

impl<R: Rng> FrequencyController<R> {
    /// Build a controller already reset for `params`.
    pub fn new(params: &ToneParameters, rng: R) -> Self {
        let mut s = Self {
            state: VariationState {
                current_hz: 0.0,
                target_hz: 0.0,
                transition_start: 0.0,
                last_change: 0.0,
                change_interval: 0.0,
                retargets: 0,
            },
            rng,
        };
        s.reset(params);
        s
    }

    /// Back to stream-start conditions: sounding at the start rate, heading for
    /// the final rate, with a freshly drawn retarget interval.
    pub fn reset(&mut self, params: &ToneParameters) {
        let (lo, hi) = params.vary_interval;
        self.state = VariationState {
            current_hz: params.start_pulse_hz,
            target_hz: params.final_pulse_hz,
            transition_start: 0.0,
            last_change: 0.0,
            change_interval: uniform(&mut self.rng, lo, hi),
            retargets: 0,
        };
    }

    /// Advance to logical time `t` and return the rate to synthesize with.
    pub fn update(&mut self, t: f64, params: &ToneParameters) -> PulseUpdate {
        let st = &mut self.state;
        let mut retargeted = false;

        if params.use_ramp && t <= params.ramp_seconds {
            st.current_hz = if params.ramp_seconds > 0.0 {
                lerp(params.start_pulse_hz, params.final_pulse_hz, t / params.ramp_seconds)
            } else {
                params.final_pulse_hz
            };
        } else {
            if params.vary_randomly && t - st.last_change >= st.change_interval {
                let amount = params.vary_amount_hz;
                st.target_hz = params.final_pulse_hz + uniform(&mut self.rng, -amount, amount);
                st.transition_start = t;
                let (lo, hi) = params.vary_interval;
                st.change_interval = uniform(&mut self.rng, lo, hi);
                st.last_change = t;
                st.retargets += 1;
                retargeted = true;
            }

            let since = t - st.transition_start;
            if since < TRANSITION_SECONDS {
                let progress = clamp(since / TRANSITION_SECONDS, 0.0, 1.0);
                let factor = sigmoid_ease(progress);
                // (1 - f)·current + f·target, written so current == target stays exact
                st.current_hz = lerp(st.current_hz, st.target_hz, factor);
            } else {
                st.current_hz = st.target_hz;
            }
        }

        PulseUpdate { current_hz: st.current_hz, target_hz: st.target_hz, retargeted }
    }

    #[inline] pub fn state(&self) -> &VariationState { &self.state }
    #[inline] pub fn current_hz(&self) -> f64 { self.state.current_hz }
    #[inline] pub fn target_hz(&self) -> f64 { self.state.target_hz }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ramp_params() -> ToneParameters {
        ToneParameters {
            use_ramp: true,
            start_pulse_hz: 15.0,
            final_pulse_hz: 40.0,
            ramp_seconds: 180.0,
            vary_randomly: false,
            ..Default::default()
        }
    }

    fn controller(p: &ToneParameters, seed: u64) -> FrequencyController<StdRng> {
        FrequencyController::new(p, StdRng::seed_from_u64(seed))
    }

    #[test]
    fn ramp_interpolates_linearly() {
        let p = ramp_params();
        let mut c = controller(&p, 1);
        assert!((c.update(0.0, &p).current_hz - 15.0).abs() < 1e-6);
        assert!((c.update(90.0, &p).current_hz - 27.5).abs() < 1e-6);
        assert!((c.update(180.0, &p).current_hz - 40.0).abs() < 1e-6);
    }

    #[test]
    fn ramp_holds_final_after_completion() {
        let p = ramp_params();
        let mut c = controller(&p, 1);
        for i in 0..=2000 {
            c.update(f64::from(i) * 0.1, &p);
        }
        let u = c.update(500.0, &p);
        assert_eq!(u.current_hz, 40.0);
        assert!(!u.retargeted);
    }

    #[test]
    fn zero_length_ramp_starts_at_final() {
        let p = ToneParameters { ramp_seconds: 0.0, ..ramp_params() };
        let mut c = controller(&p, 1);
        for i in 0..100 {
            let t = f64::from(i) * 4096.0 / 48_000.0;
            let u = c.update(t, &p);
            assert_eq!(u.current_hz, 40.0, "t={t}");
        }
    }

    #[test]
    fn without_ramp_glides_from_start_to_final() {
        let p = ToneParameters { use_ramp: false, start_pulse_hz: 10.0, final_pulse_hz: 20.0, ..ramp_params() };
        let mut c = controller(&p, 1);
        let first = c.update(0.0, &p).current_hz;
        assert!(first > 10.0 && first < 10.1, "first={first}");
        let mut prev = first;
        for i in 1..=30 {
            let now = c.update(f64::from(i) / 10.0, &p).current_hz;
            assert!(now >= prev && now <= 20.0, "i={i} prev={prev} now={now}");
            prev = now;
        }
        assert_eq!(prev, 20.0);
    }

    #[test]
    fn retarget_fires_once_at_interval_and_converges() {
        let p = ToneParameters {
            use_ramp: false,
            start_pulse_hz: 20.0,
            final_pulse_hz: 20.0,
            vary_randomly: true,
            vary_interval: (10.0, 10.0),
            vary_amount_hz: 5.0,
            ..Default::default()
        };
        let mut c = controller(&p, 7);

        // Same seed, same draw order: the offset is the first value pulled.
        let mut mirror = StdRng::seed_from_u64(7);
        let expected_target = 20.0 + mirror.gen_range(-5.0..=5.0);

        for i in 0..100 {
            let u = c.update(f64::from(i) / 10.0, &p);
            assert!(!u.retargeted, "early retarget at t={}", f64::from(i) / 10.0);
            assert_eq!(u.current_hz, 20.0);
        }

        let at_ten = c.update(10.0, &p);
        assert!(at_ten.retargeted);
        assert_eq!(at_ten.target_hz, expected_target);
        assert_eq!(c.state().retargets, 1);
        // The first glide step barely moves: no audible jump.
        let jump = (expected_target - 20.0).abs();
        assert!((at_ten.current_hz - 20.0).abs() <= 0.01 * jump + 1e-12);

        for i in 101..=130 {
            let u = c.update(f64::from(i) / 10.0, &p);
            assert!(!u.retargeted, "second retarget at i={i}");
        }
        assert_eq!(c.state().retargets, 1);
        let cur = c.current_hz();
        assert!((cur - expected_target).abs() <= 0.01 * expected_target.abs(), "cur={cur} target={expected_target}");
    }

    #[test]
    fn glide_is_monotonic_without_overshoot() {
        let p = ToneParameters {
            use_ramp: false,
            start_pulse_hz: 10.0,
            final_pulse_hz: 10.0,
            vary_randomly: true,
            vary_interval: (5.0, 5.0),
            vary_amount_hz: 8.0,
            ..Default::default()
        };
        let mut c = controller(&p, 99);
        let mut t = 0.0;
        while t < 5.0 {
            c.update(t, &p);
            t += 0.05;
        }
        let from = c.current_hz();
        let u = c.update(5.0, &p);
        assert!(u.retargeted);
        let to = u.target_hz;
        let dir = (to - from).signum();
        let mut prev = u.current_hz;
        let mut t = 5.0;
        while t < 8.0 {
            t += 0.05;
            let now = c.update(t, &p).current_hz;
            assert!((now - prev) * dir >= -1e-12, "reversed at t={t}");
            assert!((to - now) * dir >= -1e-12, "overshoot at t={t}");
            prev = now;
        }
    }

    #[test]
    fn intervals_are_drawn_within_bounds() {
        let p = ToneParameters {
            use_ramp: false,
            vary_randomly: true,
            vary_interval: (2.0, 4.0),
            vary_amount_hz: 1.5,
            ..Default::default()
        };
        let mut c = controller(&p, 3);
        let mut t = 0.0;
        while t < 600.0 {
            let u = c.update(t, &p);
            let s = c.state();
            assert!((2.0..=4.0).contains(&s.change_interval));
            assert!((u.target_hz - p.final_pulse_hz).abs() <= 1.5 + 1e-12 || s.retargets == 0);
            t += 0.1;
        }
        assert!(c.state().retargets >= 150, "retargets={}", c.state().retargets);
    }

    #[test]
    fn overflowing_variation_span_does_not_panic() {
        // validate() rejects this; the controller sees it anyway
        let p = ToneParameters {
            use_ramp: false,
            vary_randomly: true,
            vary_interval: (0.0, 0.0),
            vary_amount_hz: 1e308,
            ..Default::default()
        };
        let mut c = controller(&p, 21);
        for i in 0..10 {
            let u = c.update(f64::from(i), &p);
            assert!(u.retargeted);
            assert!(u.target_hz.is_finite() && u.current_hz.is_finite());
        }
        assert_eq!(uniform(&mut StdRng::seed_from_u64(1), f64::MIN, f64::MAX), f64::MIN);
    }

    #[test]
    fn variation_takes_over_smoothly_when_the_ramp_ends() {
        let p = ToneParameters::default();
        assert!(p.use_ramp && p.vary_randomly);
        let mut c = controller(&p, 17);
        let dt = 4096.0 / 48_000.0;

        let mut prev = c.update(0.0, &p).current_hz;
        let mut first_retarget = None;
        let mut max_step: f64 = 0.0;
        for i in 1..=3600u32 {
            let t = f64::from(i) * dt;
            let u = c.update(t, &p);
            if t <= p.ramp_seconds {
                assert!(!u.retargeted, "retarget during the ramp at t={t}");
            }
            if u.retargeted && first_retarget.is_none() {
                first_retarget = Some(t);
            }
            max_step = max_step.max((u.current_hz - prev).abs());
            prev = u.current_hz;
        }

        let first = first_retarget.expect("variation never kicked in");
        assert!(first > p.ramp_seconds && first - p.ramp_seconds <= dt, "first retarget at t={first}");
        assert!(c.state().retargets >= 2, "retargets={}", c.state().retargets);
        assert!(max_step < 0.5, "pulse rate jumped by {max_step} Hz");
    }

    #[test]
    fn reset_restores_start_conditions() {
        let p = ToneParameters { vary_interval: (10.0, 10.0), ..ramp_params() };
        let mut c = controller(&p, 5);
        c.update(100.0, &p);
        c.reset(&p);
        let s = c.state();
        assert_eq!(s.current_hz, 15.0);
        assert_eq!(s.target_hz, 40.0);
        assert_eq!(s.change_interval, 10.0);
        assert_eq!(s.retargets, 0);
    }
}
