//! Redis-backed sliding window shared across processes

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use redis::{Client, Connection};
use thiserror::Error;
use tracing::warn;

use super::{LocalWindowStore, WindowLimits, WindowStore};
use crate::core::clock::Clock;

// Namespace for window keys in the shared store.
const KEY_PREFIX: &str = "rate:";

/// Error raised while opening or talking to the remote store.
#[derive(Debug, Error)]
#[error("remote window store: {0}")]
pub struct RemoteStoreError(#[from] redis::RedisError);

/// Sliding-window store backed by a Redis sorted set per key.
///
/// Each admission runs one atomic `MULTI`/`EXEC` pipeline: purge entries
/// older than the window, add the current timestamp, count what remains, and
/// refresh the key's TTL so abandoned keys expire on their own. Because the
/// four steps execute as one unit per key, concurrent callers on different
/// machines cannot both act on a stale count.
///
/// Round-trips are bounded by the configured timeout. The first failure of
/// any kind flips the store into degraded mode for the rest of the process:
/// a warning is logged and all further calls are served by an embedded
/// [`LocalWindowStore`]. Callers only ever see a boolean.
pub struct RemoteWindowStore {
    client: Client,
    conn: Mutex<Option<Connection>>,
    limits: WindowLimits,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    // Distinguishes set members added within the same millisecond.
    seq: AtomicU64,
    degraded: AtomicBool,
    fallback: LocalWindowStore,
}

impl RemoteWindowStore {
    /// Connect to `url` and verify the server answers a `PING`.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL does not parse or the server cannot be
    /// reached.
    pub fn connect(
        url: &str,
        limits: WindowLimits,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RemoteStoreError> {
        let store = Self::connect_lazy(url, limits, timeout, clock)?;
        {
            let mut slot = store.conn.lock().unwrap();
            let conn = store.open_connection()?;
            *slot = Some(conn);
        }
        Ok(store)
    }

    /// Build a store without touching the network.
    ///
    /// The connection is established on the first [`admit`](WindowStore::admit)
    /// call; if that fails the store degrades to its local fallback exactly as
    /// it would on any later runtime failure.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL does not parse.
    pub fn connect_lazy(
        url: &str,
        limits: WindowLimits,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RemoteStoreError> {
        let client = Client::open(url)?;
        let fallback = LocalWindowStore::new(limits, clock.clone());
        Ok(RemoteWindowStore {
            client,
            conn: Mutex::new(None),
            limits,
            timeout,
            clock,
            seq: AtomicU64::new(0),
            degraded: AtomicBool::new(false),
            fallback,
        })
    }

    fn open_connection(&self) -> Result<Connection, RemoteStoreError> {
        let mut conn = self.client.get_connection()?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        redis::cmd("PING").query::<String>(&mut conn)?;
        Ok(conn)
    }

    fn admit_remote(&self, key: &str) -> Result<bool, RemoteStoreError> {
        let mut slot = self.conn.lock().unwrap();
        if slot.is_none() {
            *slot = Some(self.open_connection()?);
        }
        let conn = slot.as_mut().expect("connection was just established");

        let now_ms = wall_millis(self.clock.wall());
        let window_ms = self.limits.window.as_millis() as u64;
        let cutoff_ms = now_ms.saturating_sub(window_ms);
        let member = format!("{}-{}", now_ms, self.seq.fetch_add(1, Ordering::Relaxed));
        let redis_key = format!("{KEY_PREFIX}{key}");
        let ttl_secs = self.limits.window.as_secs().max(1);

        let result: Result<(u64,), redis::RedisError> = redis::pipe()
            .atomic()
            .cmd("ZREMRANGEBYSCORE")
            .arg(&redis_key)
            .arg(0)
            .arg(cutoff_ms)
            .ignore()
            .cmd("ZADD")
            .arg(&redis_key)
            .arg(now_ms)
            .arg(&member)
            .ignore()
            .cmd("ZCARD")
            .arg(&redis_key)
            .cmd("EXPIRE")
            .arg(&redis_key)
            .arg(ttl_secs)
            .ignore()
            .query(conn);

        match result {
            Ok((count,)) => Ok(count <= u64::from(self.limits.max_requests)),
            Err(err) => {
                *slot = None;
                Err(err.into())
            }
        }
    }
}

impl WindowStore for RemoteWindowStore {
    fn admit(&self, key: &str) -> bool {
        if self.degraded.load(Ordering::Relaxed) {
            return self.fallback.admit(key);
        }
        match self.admit_remote(key) {
            Ok(allowed) => allowed,
            Err(err) => {
                self.degraded.store(true, Ordering::Relaxed);
                warn!(
                    "Remote window store failed ({}); using local window store for the rest of the process",
                    err
                );
                self.fallback.admit(key)
            }
        }
    }

    fn reset(&self) {
        // Remote keys are shared with co-tenants and left alone.
        self.fallback.reset();
    }
}

fn wall_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
