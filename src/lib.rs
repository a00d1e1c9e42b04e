//! # Gatecrab
//!
//! Admission control for synchronous request pipelines, with opportunistic
//! reclamation of aged disk artifacts.
//!
//! ## Overview
//!
//! Gatecrab answers one question per unit of work: *may this caller proceed?*
//! The decision uses a sliding time window of recent activity per client key,
//! so limits follow `now` continuously instead of resetting on fixed bucket
//! boundaries. On the same call path, an interval gate occasionally triggers
//! a retention sweep that deletes files older than a configured age from a
//! set of directories. No background thread or timer is involved.
//!
//! ## Quick Start
//!
//! ```
//! use gatecrab::{AdmissionControl, Config};
//!
//! let gate = AdmissionControl::new(Config::default());
//!
//! if gate.check("203.0.113.7") {
//!     // perform the work
//! } else {
//!     // tell the caller to slow down
//! }
//! ```
//!
//! ## Backends
//!
//! Two window store backends implement the same [`WindowStore`] trait:
//!
//! - [`LocalWindowStore`] keeps per-key timestamp logs in a sharded,
//!   lock-protected map. This is the default and needs no external services.
//! - [`RemoteWindowStore`] (feature `redis`, on by default) keeps the window
//!   in a Redis sorted set so several processes or machines share one limit.
//!   Any connection or protocol failure degrades the process to the local
//!   backend with a logged warning; the caller never sees an error.
//!
//! The backend is chosen once at construction from [`Config`]; see
//! [`select_backend`].
//!
//! ## Configuration
//!
//! [`Config`] carries safe defaults for every option and can be populated
//! from `GATECRAB_*` environment variables with [`Config::from_env`].
//! Invalid values are logged and replaced by their defaults; a typo in an
//! environment variable never prevents startup.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and installs no subscriber. Embedding
//! binaries typically do:
//!
//! ```no_run
//! tracing_subscriber::fmt()
//!     .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
//!     .init();
//! ```
//!
//! ## Features
//!
//! - `ahash` (default): use AHash for the local window map
//! - `redis` (default): build the Redis-backed shared window store

pub mod config;
pub mod core;

pub use config::{BackendKind, Config};
pub use crate::core::admission::AdmissionControl;
pub use crate::core::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::metrics::{AdmissionMetrics, MetricsSnapshot};
pub use crate::core::retention::{RetentionSweeper, RootSweep, SweepGate, SweepReport};
#[cfg(feature = "redis")]
pub use crate::core::window::{RemoteStoreError, RemoteWindowStore};
pub use crate::core::window::{LocalWindowStore, WindowLimits, WindowStore, select_backend};
