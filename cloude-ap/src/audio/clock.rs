//! Time sources for the audio graph and media elements
//!
//! Everything time-dependent (automation evaluation, media position,
//! crossfade completion timers) reads from a shared [`Clock`], so tests can
//! drive the whole engine with a [`ManualClock`] instead of wall time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic time source in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock measured from construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually advanced clock with microsecond resolution
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `seconds` (negative values are ignored)
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            self.micros
                .fetch_add((seconds * 1_000_000.0).round() as u64, Ordering::SeqCst);
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, seconds: f64) {
        self.micros
            .store((seconds.max(0.0) * 1_000_000.0).round() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(1.5);
        assert_eq!(other.now(), 1.5);
        other.set(0.25);
        assert_eq!(clock.now(), 0.25);
    }

    #[test]
    fn test_manual_clock_ignores_negative_advance() {
        let clock = ManualClock::new();
        clock.advance(2.0);
        clock.advance(-1.0);
        assert_eq!(clock.now(), 2.0);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
