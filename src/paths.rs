//! Local cache layout and public URL composition
//!
//! Layout under the cover root:
//!
//! ```text
//! <root>/<id>/<kind>.jpg              primary original
//! <root>/<id>/<kind>-<height>.jpg     primary variant
//! <root>/Albums/<id>/cover.jpg        secondary original
//! <root>/Albums/<id>/cover-250.jpg    secondary variant
//! ```

use crate::types::{AssetKind, EntityId, EntityKind};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Directory segment that nests secondary entities under the cover root
pub const SECONDARY_SEGMENT: &str = "Albums";

/// Path segment under the URL base that serves cached covers
pub const PUBLIC_SEGMENT: &str = "MediaCover";

/// .NET-style ticks (100 ns) between 0001-01-01 and the Unix epoch
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Maps entity/asset identity to local cache paths and public URLs
#[derive(Clone, Debug)]
pub struct PathResolver {
    root: PathBuf,
    url_base: String,
}

impl PathResolver {
    /// Create a resolver rooted at `root`, publishing URLs under `url_base`
    pub fn new(root: impl Into<PathBuf>, url_base: &str) -> Self {
        Self {
            root: root.into(),
            url_base: url_base.trim_end_matches('/').to_string(),
        }
    }

    /// Directory holding every cached file of one entity
    pub fn entity_root(&self, kind: EntityKind, id: EntityId) -> PathBuf {
        match kind {
            EntityKind::Primary => self.root.join(id.to_string()),
            EntityKind::Secondary => self.root.join(SECONDARY_SEGMENT).join(id.to_string()),
        }
    }

    /// Path of an original (`height == None`) or resized variant
    pub fn cover_path(
        &self,
        kind: EntityKind,
        id: EntityId,
        asset: AssetKind,
        height: Option<u32>,
    ) -> PathBuf {
        let file_name = match height {
            Some(h) => format!("{}-{}.jpg", asset.as_str(), h),
            None => format!("{}.jpg", asset.as_str()),
        };
        self.entity_root(kind, id).join(file_name)
    }

    /// Public URL for an original, with a `lastWrite` cache-buster when cached
    ///
    /// Only reads file metadata; nothing is created or modified.
    pub fn public_url(&self, kind: EntityKind, id: EntityId, asset: AssetKind) -> String {
        let mut url = match kind {
            EntityKind::Primary => format!(
                "{}/{}/{}/{}.jpg",
                self.url_base,
                PUBLIC_SEGMENT,
                id,
                asset.as_str()
            ),
            EntityKind::Secondary => format!(
                "{}/{}/{}/{}/{}.jpg",
                self.url_base,
                PUBLIC_SEGMENT,
                SECONDARY_SEGMENT,
                id,
                asset.as_str()
            ),
        };

        let original = self.cover_path(kind, id, asset, None);
        if let Ok(modified) = std::fs::metadata(&original).and_then(|m| m.modified()) {
            url.push_str(&format!("?lastWrite={}", to_ticks(modified)));
        }

        url
    }
}

/// Sibling path used while a file is being written
pub(crate) fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

/// Convert a file time to 100 ns ticks since 0001-01-01T00:00:00Z
pub fn to_ticks(time: SystemTime) -> i64 {
    let time: DateTime<Utc> = time.into();
    time.timestamp() * 10_000_000
        + i64::from(time.timestamp_subsec_nanos() / 100)
        + UNIX_EPOCH_TICKS
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    #[test]
    fn test_primary_paths() {
        let resolver = PathResolver::new("/covers", "");
        assert_eq!(
            resolver.cover_path(EntityKind::Primary, EntityId(42), AssetKind::Poster, None),
            PathBuf::from("/covers/42/poster.jpg")
        );
        assert_eq!(
            resolver.cover_path(EntityKind::Primary, EntityId(42), AssetKind::Poster, Some(500)),
            PathBuf::from("/covers/42/poster-500.jpg")
        );
        assert_eq!(
            resolver.entity_root(EntityKind::Primary, EntityId(42)),
            PathBuf::from("/covers/42")
        );
    }

    #[test]
    fn test_secondary_paths_nest_under_albums() {
        let resolver = PathResolver::new("/covers", "");
        assert_eq!(
            resolver.cover_path(EntityKind::Secondary, EntityId(7), AssetKind::Cover, None),
            PathBuf::from("/covers/Albums/7/cover.jpg")
        );
        assert_eq!(
            resolver.cover_path(EntityKind::Secondary, EntityId(7), AssetKind::Cover, Some(250)),
            PathBuf::from("/covers/Albums/7/cover-250.jpg")
        );
    }

    #[test]
    fn test_public_url_without_cached_file() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = PathResolver::new(temp_dir.path(), "/music/");

        assert_eq!(
            resolver.public_url(EntityKind::Primary, EntityId(42), AssetKind::Fanart),
            "/music/MediaCover/42/fanart.jpg"
        );
        assert_eq!(
            resolver.public_url(EntityKind::Secondary, EntityId(7), AssetKind::Cover),
            "/music/MediaCover/Albums/7/cover.jpg"
        );
    }

    #[test]
    fn test_public_url_appends_last_write_ticks() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = PathResolver::new(temp_dir.path(), "");
        let path = resolver.cover_path(EntityKind::Primary, EntityId(1), AssetKind::Poster, None);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"jpeg").unwrap();

        let stamp = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(stamp)
            .unwrap();

        let url = resolver.public_url(EntityKind::Primary, EntityId(1), AssetKind::Poster);
        assert_eq!(
            url,
            format!("/MediaCover/1/poster.jpg?lastWrite={}", to_ticks(stamp))
        );
    }

    #[test]
    fn test_ticks_epoch() {
        assert_eq!(to_ticks(UNIX_EPOCH), UNIX_EPOCH_TICKS);
        assert_eq!(
            to_ticks(UNIX_EPOCH + Duration::from_millis(1)),
            UNIX_EPOCH_TICKS + 10_000
        );
    }
}
