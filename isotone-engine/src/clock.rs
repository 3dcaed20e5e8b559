//! Time sources for the playback timeline.
//!
//! The engine never reads the wall clock directly. It asks a [`Clock`] for a
//! monotonic "now" and derives logical playback time with [`elapsed`], so
//! pause/resume bookkeeping can be exercised without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source. `now()` must never go backwards.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Logical playback time in seconds: `now - started_at - pause_offset`,
/// saturating at zero.
#[inline]
pub fn elapsed(now: Duration, started_at: Duration, pause_offset: Duration) -> f64 {
    now.saturating_sub(started_at).saturating_sub(pause_offset).as_secs_f64()
}

/// Real clock backed by [`Instant`], measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[inline] pub fn new() -> Self { Self { origin: Instant::now() } }
}

impl Default for SystemClock {
    fn default() -> Self { Self::new() }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Duration { self.origin.elapsed() }
}

/// Hand-driven clock for tests and offline hosts.
///
/// Share it as `Arc<ManualClock>`; every clone sees the same time.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    #[inline] pub fn new() -> Self { Self::default() }

    /// Move time forward.
    #[inline]
    pub fn advance(&self, by: Duration) {
        let step = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(step, Ordering::SeqCst);
    }

    /// Move time forward by fractional seconds.
    #[inline]
    pub fn advance_secs(&self, secs: f64) { self.advance(Duration::from_secs_f64(secs.max(0.0))); }

    /// Jump to an absolute time. Ignored if it would go backwards.
    #[inline]
    pub fn set(&self, to: Duration) {
        let target = u64::try_from(to.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_max(target, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Duration { Duration::from_nanos(self.nanos.load(Ordering::SeqCst)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_subtracts_offset() {
        let t = elapsed(Duration::from_secs(100), Duration::from_secs(10), Duration::from_secs(30));
        assert_eq!(t, 60.0);
    }

    #[test]
    fn elapsed_saturates() {
        assert_eq!(elapsed(Duration::from_secs(5), Duration::from_secs(10), Duration::ZERO), 0.0);
        assert_eq!(elapsed(Duration::from_secs(20), Duration::from_secs(10), Duration::from_secs(15)), 0.0);
    }

    #[test]
    fn manual_clock_is_monotonic() {
        let c = ManualClock::new();
        c.advance_secs(1.5);
        assert_eq!(c.now(), Duration::from_millis(1500));
        c.set(Duration::from_secs(1));
        assert_eq!(c.now(), Duration::from_millis(1500));
        c.set(Duration::from_secs(3));
        assert_eq!(c.now(), Duration::from_secs(3));
    }

    #[test]
    fn system_clock_moves_forward() {
        let c = SystemClock::new();
        let a = c.now();
        std::thread::sleep(Duration::from_millis(2));
        assert!(c.now() > a);
    }
}
