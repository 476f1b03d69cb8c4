use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::LogError;
use crate::retention::{is_partition_candidate, partition_created_at};

/// Bundle every partition still inside the retention window into a fresh
/// `logs-{unix_millis}.zip` at the log root. Expired partitions are
/// excluded even when they have not been pruned yet. The caller owns the
/// returned bundle and is responsible for deleting it.
pub fn create(root: &Path, retention_days: u32) -> Result<PathBuf, LogError> {
    let name = format!("logs-{}.zip", Utc::now().timestamp_millis());
    create_named(root, retention_days, &name)
}

/// Same as `create` with a caller-chosen directory and bundle name.
pub fn create_named(dir: &Path, retention_days: u32, zip_name: &str) -> Result<PathBuf, LogError> {
    fs::create_dir_all(dir)?;
    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));

    let zip_path = dir.join(zip_name);
    let mut bundle = ZipWriter::new(File::create(&zip_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if !is_partition_candidate(&path) {
            continue;
        }
        let Some(created) = partition_created_at(&path) else {
            continue;
        };
        if created < cutoff {
            continue;
        }
        // A partition that fails mid-stream is dropped from the bundle;
        // the rest of the archive still completes.
        if let Err(e) = add_partition(&mut bundle, &path, options) {
            warn!("failed to archive log partition {:?}: {}", path, e);
        }
    }

    bundle.finish()?;
    Ok(zip_path)
}

fn add_partition(
    bundle: &mut ZipWriter<File>,
    partition: &Path,
    options: SimpleFileOptions,
) -> Result<(), LogError> {
    let dir_name = partition
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    for entry in fs::read_dir(partition)?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        bundle.start_file(format!("{}/{}", dir_name, file_name), options)?;
        let mut input = File::open(&path)?;
        io::copy(&mut input, bundle)?;
    }
    Ok(())
}

/// Remove a previously produced bundle, or a whole partition. Archives are
/// never cleaned up automatically.
pub fn clear(path: &Path) -> Result<(), LogError> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session;
    use std::collections::HashSet;

    fn write_partition(root: &Path, id: &str, files: &[&str]) {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), format!("{} contents\n", file)).unwrap();
        }
    }

    fn entry_names(zip_path: &Path) -> HashSet<String> {
        let mut archive = zip::ZipArchive::new(File::open(zip_path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_archive_includes_only_live_partitions() {
        let root = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let fresh = session::mint(now).id;
        let expired = session::mint(now - Duration::days(10)).id;
        write_partition(root.path(), &fresh, &["main.log", "renderer.log"]);
        write_partition(root.path(), &expired, &["main.log"]);

        let zip_path = create(root.path(), 7).unwrap();
        let names = entry_names(&zip_path);

        assert!(names.contains(&format!("{}/main.log", fresh)));
        assert!(names.contains(&format!("{}/renderer.log", fresh)));
        assert!(!names.iter().any(|n| n.starts_with(&expired)));

        // Bundling reads the partitions, it never moves them.
        assert!(root.path().join(&fresh).join("main.log").is_file());
        assert!(root.path().join(&expired).join("main.log").is_file());
    }

    #[test]
    fn test_archive_skips_existing_bundles() {
        let root = tempfile::tempdir().unwrap();
        write_partition(root.path(), &session::mint(Utc::now()).id, &["main.log"]);

        let first = create_named(root.path(), 7, "logs-1.zip").unwrap();
        let second = create_named(root.path(), 7, "logs-2.zip").unwrap();

        let names = entry_names(&second);
        assert!(!names.iter().any(|n| n.contains(".zip")));
        assert!(first.is_file());
    }

    #[test]
    fn test_clear_removes_bundle_but_not_sources() {
        let root = tempfile::tempdir().unwrap();
        let id = session::mint(Utc::now()).id;
        write_partition(root.path(), &id, &["main.log"]);

        let zip_path = create(root.path(), 7).unwrap();
        assert!(zip_path.is_file());

        clear(&zip_path).unwrap();
        assert!(!zip_path.exists());
        assert!(root.path().join(&id).join("main.log").is_file());
    }

    #[test]
    fn test_clear_removes_partition_directory() {
        let root = tempfile::tempdir().unwrap();
        let id = session::mint(Utc::now()).id;
        write_partition(root.path(), &id, &["main.log"]);

        clear(&root.path().join(&id)).unwrap();
        assert!(!root.path().join(&id).exists());
    }
}
