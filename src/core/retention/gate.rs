//! Interval gate in front of the sweep pass

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::clock::Clock;

/// Allows at most one sweep per configured interval.
///
/// The common path is a single lock-and-compare. When the interval has
/// elapsed, the gate advances its last-run mark *before* invoking the
/// callback, so concurrent callers racing past the comparison cannot both
/// trigger a pass; the losers see the fresh mark and back off.
pub struct SweepGate {
    interval: Duration,
    clock: Arc<dyn Clock>,
    last_run: Mutex<Option<Duration>>,
}

impl SweepGate {
    pub fn new(interval: Duration, clock: Arc<dyn Clock>) -> Self {
        SweepGate {
            interval,
            clock,
            last_run: Mutex::new(None),
        }
    }

    /// Run `sweep_fn` if the interval has elapsed since the previous run.
    ///
    /// The first call after construction always runs. Returns whether the
    /// callback was invoked. The callback executes outside the gate's lock,
    /// so a slow sweep never blocks other callers' interval checks.
    pub fn maybe_run(&self, sweep_fn: impl FnOnce()) -> bool {
        let now = self.clock.monotonic();
        {
            let mut last_run = self.last_run.lock().unwrap();
            if let Some(last) = *last_run {
                if now.saturating_sub(last) < self.interval {
                    return false;
                }
            }
            *last_run = Some(now);
        }
        sweep_fn();
        true
    }
}
