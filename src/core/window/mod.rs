//! Sliding-window stores and backend selection
//!
//! A window store answers `admit(key)` by consulting the timestamps of the
//! key's recent activity: entries older than the window are purged, the
//! survivors are counted, and the call is admitted while the count stays
//! within the configured limit. Two backends exist behind one trait, a
//! process-local sharded map and a Redis-backed variant shared across
//! processes, so callers never depend on the concrete kind.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::{BackendKind, Config};
use crate::core::clock::Clock;

mod local;
#[cfg(feature = "redis")]
mod remote;


pub use local::LocalWindowStore;
#[cfg(feature = "redis")]
pub use remote::{RemoteStoreError, RemoteWindowStore};

const DEFAULT_MAX_REQUESTS: u32 = 30;
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Limit parameters shared by both window store backends.
#[derive(Debug, Clone, Copy)]
pub struct WindowLimits {
    /// Maximum admitted events per key within one window.
    pub max_requests: u32,
    /// Sliding window duration.
    pub window: Duration,
}

impl WindowLimits {
    /// Build limits, replacing out-of-range values with safe defaults.
    ///
    /// A zero limit or zero window would deny everything forever; both are
    /// treated as configuration mistakes, logged once at construction.
    pub fn sanitized(max_requests: u32, window: Duration) -> Self {
        let max_requests = if max_requests == 0 {
            warn!(
                "Window limit of 0 requests is invalid; using {}",
                DEFAULT_MAX_REQUESTS
            );
            DEFAULT_MAX_REQUESTS
        } else {
            max_requests
        };
        let window = if window.is_zero() {
            warn!(
                "Zero window duration is invalid; using {}s",
                DEFAULT_WINDOW.as_secs()
            );
            DEFAULT_WINDOW
        } else {
            window
        };
        WindowLimits {
            max_requests,
            window,
        }
    }
}

/// Admission decisions over a sliding window of recent activity per key.
///
/// Implementations never panic and never surface backend errors to the
/// caller; the answer is always a plain boolean.
pub trait WindowStore: Send + Sync {
    /// Record activity for `key` and decide whether it may proceed.
    ///
    /// Keys are opaque: they are hashed and compared, never interpreted.
    fn admit(&self, key: &str) -> bool;

    /// Clear in-process window state.
    ///
    /// Shared remote state is deliberately left untouched so tests cannot
    /// disrupt co-tenants of the same store.
    fn reset(&self);
}

/// Choose and construct a window store backend from configuration.
///
/// Remote construction problems (a missing address, an unreachable server,
/// a build without the `redis` feature) degrade to the local backend with a
/// logged warning. Selection never fails the caller.
pub fn select_backend(config: &Config, clock: Arc<dyn Clock>) -> Box<dyn WindowStore> {
    let limits = WindowLimits::sanitized(config.max_requests, config.window);
    match config.backend {
        BackendKind::Local => Box::new(LocalWindowStore::new(limits, clock)),
        BackendKind::Remote => select_remote(config, limits, clock),
    }
}

#[cfg(feature = "redis")]
fn select_remote(
    config: &Config,
    limits: WindowLimits,
    clock: Arc<dyn Clock>,
) -> Box<dyn WindowStore> {
    let Some(url) = config.remote_url.as_deref() else {
        warn!("Remote backend selected but no address configured; using local window store");
        return Box::new(LocalWindowStore::new(limits, clock));
    };
    match RemoteWindowStore::connect(url, limits, config.remote_timeout, clock.clone()) {
        Ok(store) => {
            tracing::info!("Using remote window store at {}", url);
            Box::new(store)
        }
        Err(err) => {
            warn!(
                "Remote window store unavailable ({}); using local window store",
                err
            );
            Box::new(LocalWindowStore::new(limits, clock))
        }
    }
}

#[cfg(not(feature = "redis"))]
fn select_remote(
    _config: &Config,
    limits: WindowLimits,
    clock: Arc<dyn Clock>,
) -> Box<dyn WindowStore> {
    warn!("Remote backend selected but the `redis` feature is not enabled; using local window store");
    Box::new(LocalWindowStore::new(limits, clock))
}
