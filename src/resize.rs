//! Resized cover variants
//!
//! Each cached original gets a fixed set of smaller copies (see
//! [`AssetKind::variant_heights`]). Resizing is best-effort: a variant that
//! cannot be produced is left absent and consumers fall back to the original.

use crate::error::{Error, Result};
use crate::paths::{PathResolver, partial_path};
use crate::types::{AssetKind, EntityId, EntityKind};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Produces a resized copy of an image
#[async_trait]
pub trait ImageResizer: Send + Sync {
    /// Write `source` scaled to `height` pixels tall to `destination`
    async fn resize(&self, source: &Path, destination: &Path, height: u32) -> Result<()>;
}

/// [`ImageResizer`] backed by the `image` crate
///
/// Keeps the aspect ratio and always writes JPEG. Decoding and encoding run on
/// the blocking thread pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrateResizer;

#[async_trait]
impl ImageResizer for ImageCrateResizer {
    async fn resize(&self, source: &Path, destination: &Path, height: u32) -> Result<()> {
        let source = source.to_path_buf();
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || resize_blocking(&source, &destination, height))
            .await
            .map_err(|e| Error::Other(format!("resize task failed: {}", e)))?
    }
}

fn resize_blocking(source: &Path, destination: &Path, height: u32) -> Result<()> {
    let resize_error = |message: String| Error::Resize {
        path: source.to_path_buf(),
        message,
    };

    if height == 0 {
        return Err(resize_error("target height must be positive".to_string()));
    }

    // Originals are always named .jpg, whatever the host actually served
    let decoded = image::ImageReader::open(source)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| resize_error(e.to_string()))?
        .decode()
        .map_err(|e| resize_error(e.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(resize_error("image has no pixels".to_string()));
    }

    let target_width = scaled_width(decoded.width(), decoded.height(), height);
    let resized = decoded.resize_exact(target_width, height, FilterType::Lanczos3);
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let partial = partial_path(destination);
    if let Err(e) = rgb.save_with_format(&partial, ImageFormat::Jpeg) {
        let _ = std::fs::remove_file(&partial);
        return Err(resize_error(e.to_string()));
    }
    std::fs::rename(&partial, destination)?;

    Ok(())
}

fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    if height == 0 {
        return 0;
    }
    let scaled = (u64::from(width) * u64::from(target_height) + u64::from(height) / 2)
        / u64::from(height);
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

/// Outcome of one [`VariantResizer::ensure_variants`] pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VariantSummary {
    /// Variants written this pass
    pub generated: usize,
    /// Variants left alone because a non-empty copy already existed
    pub skipped: usize,
    /// Variants the resizer could not produce
    pub failed: usize,
}

/// Keeps the resized variants of cached originals up to date
#[derive(Clone)]
pub struct VariantResizer {
    paths: PathResolver,
    resizer: Arc<dyn ImageResizer>,
}

impl VariantResizer {
    /// Create a variant resizer
    pub fn new(paths: PathResolver, resizer: Arc<dyn ImageResizer>) -> Self {
        Self { paths, resizer }
    }

    /// Make sure every configured variant of one cached original exists.
    ///
    /// With `force_all` every variant is regenerated; otherwise only missing or
    /// empty ones are. Failures are logged per variant and never returned.
    pub async fn ensure_variants(
        &self,
        kind: EntityKind,
        id: EntityId,
        asset: AssetKind,
        force_all: bool,
    ) -> VariantSummary {
        let mut summary = VariantSummary::default();
        let heights = asset.variant_heights();
        if heights.is_empty() {
            return summary;
        }

        let original = self.paths.cover_path(kind, id, asset, None);
        if !original.is_file() {
            debug!(
                entity_id = %id,
                asset = %asset,
                path = %original.display(),
                "no cached original, skipping resize"
            );
            return summary;
        }

        for &height in heights {
            let variant = self.paths.cover_path(kind, id, asset, Some(height));

            if !force_all && has_content(&variant) {
                summary.skipped += 1;
                continue;
            }

            debug!(entity_id = %id, asset = %asset, height, "Resizing {}-{}", asset, height);

            match self.resizer.resize(&original, &variant, height).await {
                Ok(()) => summary.generated += 1,
                Err(e) => {
                    debug!(
                        entity_id = %id,
                        asset = %asset,
                        height,
                        error = %e,
                        "couldn't resize cover, using full size image instead"
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

fn has_content(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records calls and writes a marker file, failing for listed heights
    #[derive(Default)]
    struct RecordingResizer {
        calls: Mutex<Vec<u32>>,
        fail_heights: Vec<u32>,
    }

    #[async_trait]
    impl ImageResizer for RecordingResizer {
        async fn resize(&self, source: &Path, destination: &Path, height: u32) -> Result<()> {
            self.calls.lock().unwrap().push(height);
            if self.fail_heights.contains(&height) {
                return Err(Error::Resize {
                    path: source.to_path_buf(),
                    message: "corrupt".into(),
                });
            }
            fs::write(destination, format!("h{}", height)).unwrap();
            Ok(())
        }
    }

    fn setup(resizer: Arc<RecordingResizer>) -> (TempDir, PathResolver, VariantResizer) {
        let temp_dir = TempDir::new().unwrap();
        let paths = PathResolver::new(temp_dir.path(), "");
        let variants = VariantResizer::new(paths.clone(), resizer);
        (temp_dir, paths, variants)
    }

    fn write_original(paths: &PathResolver, kind: EntityKind, id: EntityId, asset: AssetKind) {
        let original = paths.cover_path(kind, id, asset, None);
        fs::create_dir_all(original.parent().unwrap()).unwrap();
        fs::write(original, b"original").unwrap();
    }

    #[tokio::test]
    async fn test_generates_all_missing_variants() {
        let resizer = Arc::new(RecordingResizer::default());
        let (_temp_dir, paths, variants) = setup(resizer.clone());
        write_original(&paths, EntityKind::Primary, EntityId(42), AssetKind::Poster);

        let summary = variants
            .ensure_variants(EntityKind::Primary, EntityId(42), AssetKind::Poster, false)
            .await;

        assert_eq!(summary.generated, 2);
        assert_eq!(*resizer.calls.lock().unwrap(), vec![500, 250]);
        assert!(
            paths
                .cover_path(EntityKind::Primary, EntityId(42), AssetKind::Poster, Some(250))
                .exists()
        );
    }

    #[tokio::test]
    async fn test_second_pass_without_force_is_idempotent() {
        let resizer = Arc::new(RecordingResizer::default());
        let (_temp_dir, paths, variants) = setup(resizer.clone());
        write_original(&paths, EntityKind::Primary, EntityId(1), AssetKind::Banner);

        variants
            .ensure_variants(EntityKind::Primary, EntityId(1), AssetKind::Banner, false)
            .await;
        let second = variants
            .ensure_variants(EntityKind::Primary, EntityId(1), AssetKind::Banner, false)
            .await;

        assert_eq!(second, VariantSummary { generated: 0, skipped: 2, failed: 0 });
        assert_eq!(resizer.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_force_regenerates_existing_variants() {
        let resizer = Arc::new(RecordingResizer::default());
        let (_temp_dir, paths, variants) = setup(resizer.clone());
        write_original(&paths, EntityKind::Primary, EntityId(1), AssetKind::Fanart);

        variants
            .ensure_variants(EntityKind::Primary, EntityId(1), AssetKind::Fanart, false)
            .await;
        let forced = variants
            .ensure_variants(EntityKind::Primary, EntityId(1), AssetKind::Fanart, true)
            .await;

        assert_eq!(forced.generated, 2);
        assert_eq!(*resizer.calls.lock().unwrap(), vec![360, 180, 360, 180]);
    }

    #[tokio::test]
    async fn test_empty_variant_is_regenerated() {
        let resizer = Arc::new(RecordingResizer::default());
        let (_temp_dir, paths, variants) = setup(resizer.clone());
        write_original(&paths, EntityKind::Secondary, EntityId(7), AssetKind::Cover);
        let variant = paths.cover_path(EntityKind::Secondary, EntityId(7), AssetKind::Cover, Some(250));
        fs::write(&variant, b"").unwrap();

        let summary = variants
            .ensure_variants(EntityKind::Secondary, EntityId(7), AssetKind::Cover, false)
            .await;

        assert_eq!(summary.generated, 1);
        assert_eq!(fs::read(&variant).unwrap(), b"h250");
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let resizer = Arc::new(RecordingResizer {
            fail_heights: vec![500],
            ..Default::default()
        });
        let (_temp_dir, paths, variants) = setup(resizer.clone());
        write_original(&paths, EntityKind::Primary, EntityId(3), AssetKind::Headshot);

        let summary = variants
            .ensure_variants(EntityKind::Primary, EntityId(3), AssetKind::Headshot, true)
            .await;

        assert_eq!(summary, VariantSummary { generated: 1, skipped: 0, failed: 1 });
        assert!(
            !paths
                .cover_path(EntityKind::Primary, EntityId(3), AssetKind::Headshot, Some(500))
                .exists()
        );
    }

    #[tokio::test]
    async fn test_unknown_kind_never_resizes() {
        let resizer = Arc::new(RecordingResizer::default());
        let (_temp_dir, paths, variants) = setup(resizer.clone());
        write_original(&paths, EntityKind::Primary, EntityId(1), AssetKind::Unknown);

        let summary = variants
            .ensure_variants(EntityKind::Primary, EntityId(1), AssetKind::Unknown, true)
            .await;

        assert_eq!(summary, VariantSummary::default());
        assert!(resizer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_original_skips_resizer() {
        let resizer = Arc::new(RecordingResizer::default());
        let (_temp_dir, _paths, variants) = setup(resizer.clone());

        let summary = variants
            .ensure_variants(EntityKind::Primary, EntityId(9), AssetKind::Poster, true)
            .await;

        assert_eq!(summary, VariantSummary::default());
        assert!(resizer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_scaled_width_keeps_aspect() {
        assert_eq!(scaled_width(1000, 1500, 500), 333);
        assert_eq!(scaled_width(1920, 1080, 360), 640);
        assert_eq!(scaled_width(1, 1000, 35), 1);
    }

    #[tokio::test]
    async fn test_image_crate_resizer_writes_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("poster.png");
        RgbImage::from_pixel(200, 300, image::Rgb([200, 10, 10]))
            .save(&source)
            .unwrap();

        // PNG bytes behind a .jpg name, as cached originals often are
        let misnamed = temp_dir.path().join("poster.jpg");
        fs::rename(&source, &misnamed).unwrap();
        let source = misnamed;

        let destination = temp_dir.path().join("poster-150.jpg");
        ImageCrateResizer
            .resize(&source, &destination, 150)
            .await
            .unwrap();

        let resized = image::open(&destination).unwrap();
        assert_eq!(resized.dimensions(), (100, 150));
        assert_eq!(
            image::guess_format(&fs::read(&destination).unwrap()).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[tokio::test]
    async fn test_image_crate_resizer_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("poster.jpg");
        fs::write(&source, b"definitely not an image").unwrap();

        let result = ImageCrateResizer
            .resize(&source, &temp_dir.path().join("poster-250.jpg"), 250)
            .await;

        assert!(matches!(result, Err(Error::Resize { .. })));
        assert!(!temp_dir.path().join("poster-250.jpg").exists());
    }
}
