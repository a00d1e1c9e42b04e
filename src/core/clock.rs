//! Time sources for the admission layer

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// Dual-view time source.
///
/// Monotonic readings drive the sliding window and the sweep gate, where only
/// elapsed time matters and the value must never jump backwards. Wall-clock
/// readings drive file-age comparison and remote-store scores, where the
/// value must be meaningful outside this process.
pub trait Clock: Send + Sync {
    /// Monotonic time elapsed since a fixed, arbitrary origin.
    fn monotonic(&self) -> Duration;

    /// Current wall-clock time.
    fn wall(&self) -> SystemTime;
}

/// Production clock backed by [`Instant`] and [`SystemTime`].
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
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
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wall(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Starts at zero elapsed time; both views advance together through
/// [`advance`](ManualClock::advance). The wall view is anchored at the
/// construction instant.
pub struct ManualClock {
    offset_ms: AtomicU64,
    wall_origin: SystemTime,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            offset_ms: AtomicU64::new(0),
            wall_origin: SystemTime::now(),
        }
    }

    /// Move both time views forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.offset_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn monotonic(&self) -> Duration {
        Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }

    fn wall(&self) -> SystemTime {
        self.wall_origin + self.monotonic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock::new();
        let first = clock.monotonic();
        let second = clock.monotonic();
        assert!(second >= first);
    }

    #[test]
    fn manual_clock_moves_both_views() {
        let clock = ManualClock::new();
        let wall_start = clock.wall();
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.monotonic(), Duration::from_secs(90));
        assert_eq!(wall_start + Duration::from_secs(90), clock.wall());
    }
}
