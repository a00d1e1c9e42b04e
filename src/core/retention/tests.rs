use std::fs::{File, FileTimes};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use super::{RetentionSweeper, SweepGate};
use crate::core::clock::{ManualClock, SystemClock};

const HOUR: Duration = Duration::from_secs(3600);

fn file_with_age(dir: &Path, name: &str, age: Duration) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    file.set_times(FileTimes::new().set_modified(SystemTime::now() - age))
        .unwrap();
    path
}

fn sweeper(roots: Vec<PathBuf>, retention_age: Duration) -> RetentionSweeper {
    RetentionSweeper::new(roots, retention_age, Arc::new(SystemClock::new()))
}

#[test]
fn deletes_only_files_past_the_retention_age() {
    let dir = TempDir::new().unwrap();
    let fresh = file_with_age(dir.path(), "fresh.csv", HOUR);
    let near = file_with_age(dir.path(), "near.csv", 23 * HOUR);
    let over = file_with_age(dir.path(), "over.csv", 25 * HOUR);
    let old = file_with_age(dir.path(), "old.csv", 48 * HOUR);

    let report = sweeper(vec![dir.path().to_path_buf()], 24 * HOUR).sweep();

    assert!(fresh.exists());
    assert!(near.exists());
    assert!(!over.exists());
    assert!(!old.exists());
    assert_eq!(report.scanned(), 4);
    assert_eq!(report.deleted(), 2);
    assert_eq!(report.failed(), 0);
}

#[test]
fn sweeps_every_configured_root() {
    let uploads = TempDir::new().unwrap();
    let reports = TempDir::new().unwrap();
    let a = file_with_age(uploads.path(), "a.csv", 30 * HOUR);
    let b = file_with_age(reports.path(), "b.html", 30 * HOUR);

    let report = sweeper(
        vec![uploads.path().to_path_buf(), reports.path().to_path_buf()],
        24 * HOUR,
    )
    .sweep();

    assert!(!a.exists());
    assert!(!b.exists());
    assert_eq!(report.roots.len(), 2);
    assert_eq!(report.deleted(), 2);
}

#[cfg(unix)]
#[test]
fn symlinks_are_never_followed_or_deleted() {
    let outside = TempDir::new().unwrap();
    let target = file_with_age(outside.path(), "target.csv", 48 * HOUR);

    let root = TempDir::new().unwrap();
    let link = root.path().join("link.csv");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let report = sweeper(vec![root.path().to_path_buf()], 24 * HOUR).sweep();

    assert!(target.exists());
    assert!(link.symlink_metadata().is_ok());
    assert_eq!(report.deleted(), 0);
    assert_eq!(report.skipped(), 1);
}

#[test]
fn directories_are_left_alone() {
    let root = TempDir::new().unwrap();
    let subdir = root.path().join("archive");
    std::fs::create_dir(&subdir).unwrap();

    let report = sweeper(vec![root.path().to_path_buf()], Duration::ZERO).sweep();

    assert!(subdir.exists());
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.deleted(), 0);
}

#[test]
fn missing_root_is_quietly_ignored() {
    let report = sweeper(vec![PathBuf::from("/nonexistent/gatecrab-sweep")], HOUR).sweep();
    assert_eq!(report.scanned(), 0);
    assert_eq!(report.failed(), 0);
}

#[test]
fn gate_runs_at_most_once_per_interval() {
    let clock = Arc::new(ManualClock::new());
    let gate = SweepGate::new(Duration::from_secs(60), clock.clone());
    let runs = AtomicUsize::new(0);

    assert!(gate.maybe_run(|| {
        runs.fetch_add(1, Ordering::SeqCst);
    }));
    assert!(!gate.maybe_run(|| {
        runs.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(59));
    assert!(!gate.maybe_run(|| {
        runs.fetch_add(1, Ordering::SeqCst);
    }));

    clock.advance(Duration::from_secs(2));
    assert!(gate.maybe_run(|| {
        runs.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}
