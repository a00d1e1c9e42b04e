//! Age-based deletion of files under configured roots

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::core::clock::Clock;

/// Outcome counts for one root in a sweep pass.
#[derive(Debug, Clone, Default)]
pub struct RootSweep {
    pub root: PathBuf,
    /// Directory entries examined.
    pub scanned: usize,
    /// Files removed because their age exceeded the retention age.
    pub deleted: usize,
    /// Symlinks, non-files, and entries that vanished mid-pass.
    pub skipped: usize,
    /// Entries whose stat or delete failed.
    pub failed: usize,
}

/// Outcome of one sweep pass across all configured roots.
///
/// Purely observational: nothing in the admission path branches on it.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub roots: Vec<RootSweep>,
}

impl SweepReport {
    pub fn scanned(&self) -> usize {
        self.roots.iter().map(|r| r.scanned).sum()
    }

    pub fn deleted(&self) -> usize {
        self.roots.iter().map(|r| r.deleted).sum()
    }

    pub fn skipped(&self) -> usize {
        self.roots.iter().map(|r| r.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.roots.iter().map(|r| r.failed).sum()
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scanned, {} deleted, {} skipped, {} failed",
            self.scanned(),
            self.deleted(),
            self.skipped(),
            self.failed()
        )
    }
}

enum EntryOutcome {
    Deleted,
    Kept,
    Skipped,
}

/// Deletes files older than a retention age from a set of root directories.
///
/// Only direct, non-symlink file entries are considered. Symlinks are never
/// followed or deleted: a crafted link inside a swept root must not reach
/// outside it. Per-entry errors are logged, counted, and never abort the
/// remaining entries or roots; other processes may create and delete files in
/// the same roots concurrently.
pub struct RetentionSweeper {
    roots: Vec<PathBuf>,
    retention_age: Duration,
    clock: Arc<dyn Clock>,
}

impl RetentionSweeper {
    pub fn new(roots: Vec<PathBuf>, retention_age: Duration, clock: Arc<dyn Clock>) -> Self {
        RetentionSweeper {
            roots,
            retention_age,
            clock,
        }
    }

    /// Sweep every configured root once and report what happened.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.wall();
        let mut report = SweepReport::default();
        for root in &self.roots {
            report.roots.push(self.sweep_root(root, now));
        }
        info!(
            "Retention sweep finished (age limit {}s): {}",
            self.retention_age.as_secs(),
            report
        );
        report
    }

    fn sweep_root(&self, root: &Path, now: SystemTime) -> RootSweep {
        let mut counts = RootSweep {
            root: root.to_path_buf(),
            ..RootSweep::default()
        };
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            // A root that does not exist yet is simply not swept.
            Err(err) if err.kind() == io::ErrorKind::NotFound => return counts,
            Err(err) => {
                warn!("Cannot list {}: {}", root.display(), err);
                counts.failed += 1;
                return counts;
            }
        };
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!("Unreadable entry under {}: {}", root.display(), err);
                    counts.failed += 1;
                    continue;
                }
            };
            counts.scanned += 1;
            match self.sweep_entry(&path, now) {
                Ok(EntryOutcome::Deleted) => counts.deleted += 1,
                Ok(EntryOutcome::Kept) => {}
                Ok(EntryOutcome::Skipped) => counts.skipped += 1,
                Err(err) => {
                    warn!("Failed to clean up {}: {}", path.display(), err);
                    counts.failed += 1;
                }
            }
        }
        counts
    }

    fn sweep_entry(&self, path: &Path, now: SystemTime) -> io::Result<EntryOutcome> {
        // symlink_metadata stats the link itself; links are never followed.
        let meta = fs::symlink_metadata(path)?;
        if meta.file_type().is_symlink() || !meta.file_type().is_file() {
            return Ok(EntryOutcome::Skipped);
        }
        let mtime = meta.modified()?;
        // A file with an mtime in the future counts as freshly modified.
        let age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
        if age <= self.retention_age {
            return Ok(EntryOutcome::Kept);
        }
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed stale file {}", path.display());
                Ok(EntryOutcome::Deleted)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                // Another process got there first.
                debug!("{} vanished before deletion", path.display());
                Ok(EntryOutcome::Skipped)
            }
            Err(err) => Err(err),
        }
    }
}
