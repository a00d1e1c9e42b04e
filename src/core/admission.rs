//! The entry point the request pipeline calls before doing real work

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::core::clock::{Clock, SystemClock};
use crate::core::metrics::{AdmissionMetrics, MetricsSnapshot};
use crate::core::retention::{RetentionSweeper, SweepGate};
use crate::core::window::{self, WindowStore};

/// Facade combining the sliding-window limiter with the retention sweep.
///
/// Constructed once at process start and shared by reference with every
/// request handler; there is no ambient global state. Each [`check`] first
/// gives the sweep gate a chance to run a retention pass, then asks the
/// selected window store for an admission decision.
///
/// The sweep runs synchronously on whichever call happens to cross the
/// interval boundary: roughly once per interval, one caller absorbs the sweep
/// latency, and in exchange the system carries no background-task lifecycle.
///
/// [`check`]: AdmissionControl::check
pub struct AdmissionControl {
    store: Box<dyn WindowStore>,
    sweeper: RetentionSweeper,
    gate: SweepGate,
    metrics: AdmissionMetrics,
}

impl AdmissionControl {
    /// Build from configuration with the system clock.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Build with an explicit clock.
    ///
    /// Tests inject a [`ManualClock`](crate::ManualClock) here to step
    /// through window and interval boundaries deterministically.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let store = window::select_backend(&config, clock.clone());
        let sweeper = RetentionSweeper::new(
            config.sweep_roots.clone(),
            config.retention_age,
            clock.clone(),
        );
        let gate = SweepGate::new(config.sweep_interval, clock);
        AdmissionControl {
            store,
            sweeper,
            gate,
            metrics: AdmissionMetrics::new(),
        }
    }

    /// Decide whether the unit of work identified by `key` may proceed.
    ///
    /// Never panics and never blocks beyond the store's bounded work; an
    /// empty key is a caller bug and is denied without being recorded.
    pub fn check(&self, key: &str) -> bool {
        self.gate.maybe_run(|| {
            let report = self.sweeper.sweep();
            self.metrics.record_sweep(&report);
        });

        if key.is_empty() {
            debug!("Admission check with empty key; denying");
            self.metrics.record_decision(false);
            return false;
        }

        let allowed = self.store.admit(key);
        if !allowed {
            warn!("Rate limit exceeded for {}", key);
        }
        self.metrics.record_decision(allowed);
        allowed
    }

    /// Clear the limiter's in-process state.
    ///
    /// Test hook: shared remote state is never cleared.
    pub fn reset(&self) {
        self.store.reset();
    }

    /// Snapshot of the decision and sweep counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
