//! Test support utilities
//!
//! Helpers for inspecting what file hooks wrote to disk. Only available
//! when the `test-support` feature is enabled.

use crate::writer::is_backup_name;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

/// Names of the rotated backups of `path`, oldest first.
///
/// Numbered backups are ordered by index, highest (oldest) first; date
/// stamped backups by name. Compressed backups are included.
///
/// # Panics
///
/// Panics if `path` has no UTF-8 file name or its directory cannot be read.
#[must_use]
pub fn backups(path: &Path) -> Vec<String> {
    let directory = parent(path);
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .expect("log path has a UTF-8 file name");

    let mut backups: Vec<_> = fs::read_dir(directory)
        .expect("log directory is readable")
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|file| is_backup_name(name, file))
        .collect();
    backups.sort_by(|a, b| compare_backups(&a[name.len() + 1..], &b[name.len() + 1..]));
    backups
}

/// Contents of the uncompressed backups of `path`, oldest first, followed
/// by the active file.
///
/// # Panics
///
/// Panics if any of the files cannot be read.
#[must_use]
pub fn read_logs(path: &Path) -> String {
    let directory = parent(path);

    let mut logs: String = backups(path)
        .iter()
        .filter(|backup| !backup.ends_with(".gz"))
        .map(|backup| fs::read_to_string(directory.join(backup)).expect("backup is readable"))
        .collect();
    if path.exists() {
        logs.push_str(&fs::read_to_string(path).expect("log file is readable"));
    }
    logs
}

fn parent(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn compare_backups(a: &str, b: &str) -> Ordering {
    let index = |suffix: &str| suffix.strip_suffix(".gz").unwrap_or(suffix).parse::<u64>().ok();
    match (index(a), index(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        _ => a.cmp(b),
    }
}
