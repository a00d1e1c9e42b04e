//! Process-local sliding-window store

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

use super::{WindowLimits, WindowStore};
use crate::core::clock::Clock;

const DEFAULT_SHARD_COUNT: usize = 16;

// Shards drop fully-expired keys after this many mutations, so keys with
// one-time activity do not accumulate forever.
const SHARD_CLEANUP_OPS: usize = 4096;

/// Sliding-window store held entirely in process memory.
///
/// Keys are partitioned across independently locked shards: concurrent calls
/// for the same key serialize around that key's shard, while calls for keys
/// on different shards proceed in parallel. Each key maps to the monotonic
/// timestamps of its recent admissions; timestamps older than the window are
/// purged lazily on every access.
pub struct LocalWindowStore {
    shards: Vec<Mutex<Shard>>,
    limits: WindowLimits,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct Shard {
    entries: HashMap<String, Vec<Duration>>,
    ops_since_cleanup: usize,
}

impl LocalWindowStore {
    pub fn new(limits: WindowLimits, clock: Arc<dyn Clock>) -> Self {
        Self::with_shard_count(limits, clock, DEFAULT_SHARD_COUNT)
    }

    pub fn with_shard_count(
        limits: WindowLimits,
        clock: Arc<dyn Clock>,
        shard_count: usize,
    ) -> Self {
        assert!(shard_count > 0, "shard count must be greater than 0");
        let shards = (0..shard_count).map(|_| Mutex::new(Shard::default())).collect();
        LocalWindowStore {
            shards,
            limits,
            clock,
        }
    }

    fn shard_for(&self, key: &str) -> &Mutex<Shard> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    #[cfg(test)]
    pub(crate) fn key_count(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap().entries.len())
            .sum()
    }

    #[cfg(test)]
    pub(crate) fn cleanup_ops() -> usize {
        SHARD_CLEANUP_OPS
    }
}

impl WindowStore for LocalWindowStore {
    fn admit(&self, key: &str) -> bool {
        let now = self.clock.monotonic();
        // None until the process has been up for one full window; nothing can
        // be expired before that.
        let cutoff = now.checked_sub(self.limits.window);

        let mut shard = self.shard_for(key).lock().unwrap();
        shard.maybe_drop_idle_keys(cutoff);

        let stamps = shard.entries.entry(key.to_string()).or_default();
        if let Some(cutoff) = cutoff {
            stamps.retain(|&ts| ts > cutoff);
        }
        if stamps.len() as u64 >= u64::from(self.limits.max_requests) {
            return false;
        }
        stamps.push(now);
        true
    }

    fn reset(&self) {
        for shard in &self.shards {
            let mut shard = shard.lock().unwrap();
            shard.entries.clear();
            shard.ops_since_cleanup = 0;
        }
    }
}

impl Shard {
    // Coarse eviction pass: every SHARD_CLEANUP_OPS mutations, drop keys
    // whose timestamps all fall outside the window.
    fn maybe_drop_idle_keys(&mut self, cutoff: Option<Duration>) {
        self.ops_since_cleanup += 1;
        if self.ops_since_cleanup < SHARD_CLEANUP_OPS {
            return;
        }
        self.ops_since_cleanup = 0;
        let Some(cutoff) = cutoff else { return };
        self.entries
            .retain(|_, stamps| stamps.iter().any(|&ts| ts > cutoff));
    }
}
