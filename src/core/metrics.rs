//! Lightweight counters for admission decisions and sweep passes
//!
//! Atomic counters only; zero allocations on the hot path. Values are for
//! observability; nothing in the admission logic reads them back.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::retention::SweepReport;

/// Counters collected by [`AdmissionControl`](crate::AdmissionControl).
#[derive(Debug, Default)]
pub struct AdmissionMetrics {
    allowed: AtomicU64,
    denied: AtomicU64,
    sweep_passes: AtomicU64,
    files_deleted: AtomicU64,
    sweep_failures: AtomicU64,
}

impl AdmissionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decision(&self, allowed: bool) {
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_sweep(&self, report: &SweepReport) {
        self.sweep_passes.fetch_add(1, Ordering::Relaxed);
        self.files_deleted
            .fetch_add(report.deleted() as u64, Ordering::Relaxed);
        self.sweep_failures
            .fetch_add(report.failed() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            sweep_passes: self.sweep_passes.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            sweep_failures: self.sweep_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub allowed: u64,
    pub denied: u64,
    pub sweep_passes: u64,
    pub files_deleted: u64,
    pub sweep_failures: u64,
}
