use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::session;

/// A root entry counts as a partition when it is a visible directory.
/// Dot-entries and archive bundles are never considered.
pub(crate) fn is_partition_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.ends_with(".zip") {
        return false;
    }
    path.is_dir()
}

/// Best guess at a partition's creation time. Session-named directories
/// carry their hour bucket in the name; anything else falls back to
/// filesystem birth time, then mtime where birth time is unavailable.
pub(crate) fn partition_created_at(path: &Path) -> Option<DateTime<Utc>> {
    let name = path.file_name().and_then(|n| n.to_str());
    if let Some(stamp) = name.and_then(session::parse_id_time) {
        return Some(stamp);
    }
    let meta = fs::metadata(path).ok()?;
    let created = meta.created().or_else(|_| meta.modified()).ok()?;
    Some(DateTime::<Utc>::from(created))
}

/// Delete every partition strictly older than the retention window.
/// Partitions that fail to stat or remove are skipped with a warning;
/// pruning continues for the rest.
pub fn prune(root: &Path, retention_days: u32) -> String {
    prune_at(root, retention_days, Utc::now())
}

fn prune_at(root: &Path, retention_days: u32, now: DateTime<Utc>) -> String {
    let cutoff = now - Duration::days(i64::from(retention_days));

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        // Nothing written yet: the root itself is created lazily.
        Err(_) => return summary(0, retention_days),
    };

    let mut removed = 0usize;
    for entry in entries.flatten() {
        let path = entry.path();
        if !is_partition_candidate(&path) {
            continue;
        }
        let Some(created) = partition_created_at(&path) else {
            warn!("skipping log partition with unreadable age: {:?}", path);
            continue;
        };
        if created < cutoff {
            match fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("failed to remove expired log partition {:?}: {}", path, e),
            }
        }
    }
    summary(removed, retention_days)
}

fn summary(removed: usize, retention_days: u32) -> String {
    format!(
        "{} log partition(s) older than {} day(s) cleared",
        removed, retention_days
    )
}

/// Construction-time retention pass: runs on its own thread with errors
/// swallowed. Callers drop the handle instead of joining it.
pub fn spawn_prune(root: PathBuf, retention_days: u32) -> JoinHandle<String> {
    thread::spawn(move || prune(&root, retention_days))
}
