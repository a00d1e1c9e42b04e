//! Admission layer configuration
//!
//! Every recognized option has a safe default. Values can be supplied
//! programmatically, deserialized from an embedding application's own
//! configuration file, or read from `GATECRAB_*` environment variables with
//! [`Config::from_env`].
//!
//! Invalid values never abort startup: each one is logged with a warning and
//! replaced by its default. An admission layer that refuses to start over a
//! typo'd variable would take the whole pipeline down with it.

use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_MAX_REQUESTS: u32 = 30;
const DEFAULT_WINDOW_SECS: u64 = 60;
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 250;
const DEFAULT_RETENTION_HOURS: u64 = 24;
const DEFAULT_SWEEP_INTERVAL_MINS: u64 = 60;

/// Window store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local sharded store.
    #[default]
    Local,
    /// Redis-backed store shared across processes.
    Remote,
}

/// Error returned when a backend name is not recognized.
#[derive(Debug, Error)]
#[error("invalid backend kind: {0}. Valid options are: local, remote")]
pub struct ParseBackendError(String);

impl FromStr for BackendKind {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            _ => Err(ParseBackendError(s.to_string())),
        }
    }
}

/// Configuration for [`AdmissionControl`](crate::AdmissionControl).
///
/// | field | environment variable | default |
/// |---|---|---|
/// | `max_requests` | `GATECRAB_MAX_REQUESTS` | 30 |
/// | `window` | `GATECRAB_WINDOW_SECS` | 60s |
/// | `backend` | `GATECRAB_BACKEND` | `local` |
/// | `remote_url` | `GATECRAB_REDIS_URL` | none |
/// | `remote_timeout` | `GATECRAB_REMOTE_TIMEOUT_MS` | 250ms |
/// | `retention_age` | `GATECRAB_RETENTION_HOURS` | 24h |
/// | `sweep_interval` | `GATECRAB_SWEEP_INTERVAL_MINS` | 60m |
/// | `sweep_roots` | `GATECRAB_SWEEP_ROOTS` (comma-separated) | empty |
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum admitted events per key within one window.
    pub max_requests: u32,
    /// Sliding window duration.
    pub window: Duration,
    /// Which window store backend to construct.
    pub backend: BackendKind,
    /// Connection URL for the remote backend (e.g. `redis://127.0.0.1:6379`).
    pub remote_url: Option<String>,
    /// Per-call network timeout for the remote backend.
    pub remote_timeout: Duration,
    /// Age past which swept files are deleted.
    pub retention_age: Duration,
    /// Minimum spacing between retention sweep passes.
    pub sweep_interval: Duration,
    /// Directories scanned by the retention sweep.
    pub sweep_roots: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
            backend: BackendKind::Local,
            remote_url: None,
            remote_timeout: Duration::from_millis(DEFAULT_REMOTE_TIMEOUT_MS),
            retention_age: Duration::from_secs(DEFAULT_RETENTION_HOURS * 3600),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_MINS * 60),
            sweep_roots: Vec::new(),
        }
    }
}

impl Config {
    /// Read configuration from `GATECRAB_*` environment variables.
    ///
    /// Absent variables keep their defaults; invalid ones are logged and
    /// replaced. This never fails.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    // Parameterized over the variable lookup so tests stay off the process
    // environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(raw) = lookup("GATECRAB_MAX_REQUESTS") {
            match raw.parse::<u32>() {
                Ok(n) if n > 0 => config.max_requests = n,
                _ => warn!(
                    "Invalid GATECRAB_MAX_REQUESTS '{}'; using {}",
                    raw, DEFAULT_MAX_REQUESTS
                ),
            }
        }

        if let Some(raw) = lookup("GATECRAB_WINDOW_SECS") {
            match parse_positive_secs(&raw) {
                Some(window) => config.window = window,
                None => warn!(
                    "Invalid GATECRAB_WINDOW_SECS '{}'; using {}s",
                    raw, DEFAULT_WINDOW_SECS
                ),
            }
        }

        if let Some(raw) = lookup("GATECRAB_BACKEND") {
            match raw.parse::<BackendKind>() {
                Ok(backend) => config.backend = backend,
                Err(err) => warn!("{}; using local", err),
            }
        }

        config.remote_url = lookup("GATECRAB_REDIS_URL").filter(|url| !url.trim().is_empty());

        if let Some(raw) = lookup("GATECRAB_REMOTE_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.remote_timeout = Duration::from_millis(ms),
                _ => warn!(
                    "Invalid GATECRAB_REMOTE_TIMEOUT_MS '{}'; using {}ms",
                    raw, DEFAULT_REMOTE_TIMEOUT_MS
                ),
            }
        }

        if let Some(raw) = lookup("GATECRAB_RETENTION_HOURS") {
            match parse_positive_secs(&raw).map(|d| d.mul_f64(3600.0)) {
                Some(age) => config.retention_age = age,
                None => warn!(
                    "Invalid GATECRAB_RETENTION_HOURS '{}'; using {}h",
                    raw, DEFAULT_RETENTION_HOURS
                ),
            }
        }

        if let Some(raw) = lookup("GATECRAB_SWEEP_INTERVAL_MINS") {
            match parse_positive_secs(&raw).map(|d| d.mul_f64(60.0)) {
                Some(interval) => config.sweep_interval = interval,
                None => warn!(
                    "Invalid GATECRAB_SWEEP_INTERVAL_MINS '{}'; using {}m",
                    raw, DEFAULT_SWEEP_INTERVAL_MINS
                ),
            }
        }

        if let Some(raw) = lookup("GATECRAB_SWEEP_ROOTS") {
            config.sweep_roots = raw
                .split(',')
                .map(str::trim)
                .filter(|root| !root.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        if config.backend == BackendKind::Remote && config.remote_url.is_none() {
            warn!("GATECRAB_BACKEND=remote but GATECRAB_REDIS_URL is missing; using local");
            config.backend = BackendKind::Local;
        }

        config
    }
}

// Fractional values are accepted ("0.5" hours is a valid retention age).
fn parse_positive_secs(raw: &str) -> Option<Duration> {
    match raw.parse::<f64>() {
        Ok(value) if value > 0.0 && value.is_finite() => Some(Duration::from_secs_f64(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.max_requests, 30);
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.backend, BackendKind::Local);
        assert!(config.remote_url.is_none());
        assert_eq!(config.retention_age, Duration::from_secs(24 * 3600));
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert!(config.sweep_roots.is_empty());
    }

    #[test]
    fn reads_valid_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("GATECRAB_MAX_REQUESTS", "5"),
            ("GATECRAB_WINDOW_SECS", "10"),
            ("GATECRAB_BACKEND", "remote"),
            ("GATECRAB_REDIS_URL", "redis://127.0.0.1:6379"),
            ("GATECRAB_REMOTE_TIMEOUT_MS", "100"),
            ("GATECRAB_RETENTION_HOURS", "48"),
            ("GATECRAB_SWEEP_INTERVAL_MINS", "5"),
        ]));
        assert_eq!(config.max_requests, 5);
        assert_eq!(config.window, Duration::from_secs(10));
        assert_eq!(config.backend, BackendKind::Remote);
        assert_eq!(config.remote_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(config.remote_timeout, Duration::from_millis(100));
        assert_eq!(config.retention_age, Duration::from_secs(48 * 3600));
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("GATECRAB_MAX_REQUESTS", "zero"),
            ("GATECRAB_WINDOW_SECS", "-3"),
            ("GATECRAB_BACKEND", "etcd"),
            ("GATECRAB_REMOTE_TIMEOUT_MS", "0"),
            ("GATECRAB_RETENTION_HOURS", "NaN"),
            ("GATECRAB_SWEEP_INTERVAL_MINS", ""),
        ]));
        assert_eq!(config.max_requests, 30);
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.backend, BackendKind::Local);
        assert_eq!(config.remote_timeout, Duration::from_millis(250));
        assert_eq!(config.retention_age, Duration::from_secs(24 * 3600));
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
    }

    #[test]
    fn fractional_durations_are_accepted() {
        let config = Config::from_lookup(lookup_from(&[
            ("GATECRAB_WINDOW_SECS", "1.5"),
            ("GATECRAB_RETENTION_HOURS", "0.5"),
            ("GATECRAB_SWEEP_INTERVAL_MINS", "2.5"),
        ]));
        assert_eq!(config.window, Duration::from_millis(1500));
        assert_eq!(config.retention_age, Duration::from_secs(1800));
        assert_eq!(config.sweep_interval, Duration::from_secs(150));
    }

    #[test]
    fn remote_backend_without_url_downgrades_to_local() {
        let config = Config::from_lookup(lookup_from(&[("GATECRAB_BACKEND", "remote")]));
        assert_eq!(config.backend, BackendKind::Local);
    }

    #[test]
    fn sweep_roots_are_split_on_commas() {
        let config = Config::from_lookup(lookup_from(&[(
            "GATECRAB_SWEEP_ROOTS",
            "uploads, static/images ,,static/reports",
        )]));
        assert_eq!(
            config.sweep_roots,
            vec![
                PathBuf::from("uploads"),
                PathBuf::from("static/images"),
                PathBuf::from("static/reports"),
            ]
        );
    }

    #[test]
    fn backend_kind_parses_case_insensitively() {
        assert_eq!("LOCAL".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert_eq!("Remote".parse::<BackendKind>().unwrap(), BackendKind::Remote);
        assert!("memcached".parse::<BackendKind>().is_err());
    }
}
