//! Cache freshness checks

use chrono::{DateTime, Utc};
use std::path::Path;

/// Modification time of a local file, if it exists
pub fn local_modified(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Whether the cached file at `path` is at least as new as `remote_modified`.
///
/// A missing file is never fresh. Only reads metadata.
pub fn is_fresh(remote_modified: DateTime<Utc>, path: &Path) -> bool {
    match local_modified(path) {
        Some(local) => local >= remote_modified,
        None => false,
    }
}
