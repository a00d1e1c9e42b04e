//! Core components of the admission layer
//!
//! This module contains the fundamental building blocks:
//! - [`clock`]: monotonic and wall-clock time sources
//! - [`window`]: sliding-window stores and backend selection
//! - [`retention`]: the sweep pass and the interval gate in front of it
//! - [`admission`]: the facade the request pipeline calls
//! - [`metrics`]: decision and sweep counters

pub mod admission;
pub mod clock;
pub mod metrics;
pub mod retention;
pub mod window;


pub use admission::AdmissionControl;
pub use clock::{Clock, ManualClock, SystemClock};
pub use metrics::{AdmissionMetrics, MetricsSnapshot};
pub use retention::{RetentionSweeper, RootSweep, SweepGate, SweepReport};
pub use window::{LocalWindowStore, WindowLimits, WindowStore, select_backend};
