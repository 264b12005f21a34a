//! Cover synchronization driven by entity lifecycle events
//!
//! On update, every declared cover of the primary entity and the `Cover` asset
//! of each of its secondary entities goes through the same pipeline:
//!
//! 1. probe the remote last-modified time
//! 2. skip the download if the cached original is at least that new
//! 3. otherwise download it and stamp it with the remote time
//! 4. bring the resized variants up to date, regenerating all of them when a
//!    new original was downloaded in step 3
//!
//! Every step is best-effort per asset. After the pass a
//! [`Event::CoversUpdated`] is broadcast regardless of individual failures.
//!
//! On delete, the primary entity's cache directory is removed. Secondary
//! entities nested under `Albums/` are not touched by a primary delete.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::AssetFetcher;
use crate::freshness::is_fresh;
use crate::paths::PathResolver;
use crate::probe::probe_last_modified;
use crate::remote::{HttpRemoteSource, RemoteSource};
use crate::resize::{ImageCrateResizer, ImageResizer, VariantResizer};
use crate::types::{
    AssetDescriptor, AssetKind, EntityId, EntityKind, Event, LifecycleEvent, PrimaryEntity,
    SecondaryEntity,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Lookup of the secondary entities (albums) owned by a primary entity
#[async_trait]
pub trait SecondaryEntityProvider: Send + Sync {
    /// All secondary entities belonging to `primary_id`
    async fn secondary_entities(&self, primary_id: EntityId) -> Result<Vec<SecondaryEntity>>;
}

/// What happened to a single asset during an update pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AssetOutcome {
    Fresh,
    Downloaded,
    ProbeFailed,
    FetchFailed,
}

/// Tally of one update pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Assets that were already current
    pub fresh: usize,
    /// Assets downloaded this pass
    pub downloaded: usize,
    /// Assets whose probe or download failed
    pub failed: usize,
    /// Variants generated across all assets
    pub variants_generated: usize,
    /// Variants that could not be generated
    pub variants_failed: usize,
}

impl SyncReport {
    fn record(&mut self, outcome: AssetOutcome) {
        match outcome {
            AssetOutcome::Fresh => self.fresh += 1,
            AssetOutcome::Downloaded => self.downloaded += 1,
            AssetOutcome::ProbeFailed | AssetOutcome::FetchFailed => self.failed += 1,
        }
    }
}

/// Keeps the local cover cache in sync with remote cover sources
#[derive(Clone)]
pub struct MediaCoverService {
    paths: PathResolver,
    remote: Arc<dyn RemoteSource>,
    fetcher: AssetFetcher,
    variants: VariantResizer,
    secondaries: Arc<dyn SecondaryEntityProvider>,
    event_tx: broadcast::Sender<Event>,
}

impl MediaCoverService {
    /// Create a service using HTTP for remote covers and the `image` crate for resizing
    pub fn new(config: &Config, secondaries: Arc<dyn SecondaryEntityProvider>) -> Result<Self> {
        let remote = Arc::new(HttpRemoteSource::new(&config.http)?);
        Self::with_collaborators(config, remote, Arc::new(ImageCrateResizer), secondaries)
    }

    /// Create a service with explicit remote source and resizer implementations
    pub fn with_collaborators(
        config: &Config,
        remote: Arc<dyn RemoteSource>,
        resizer: Arc<dyn ImageResizer>,
        secondaries: Arc<dyn SecondaryEntityProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let paths = PathResolver::new(&config.cover_root, config.normalized_url_base());
        let (event_tx, _rx) = broadcast::channel(config.event_channel_capacity);

        Ok(Self {
            fetcher: AssetFetcher::new(remote.clone()),
            variants: VariantResizer::new(paths.clone(), resizer),
            paths,
            remote,
            secondaries,
            event_tx,
        })
    }

    /// Subscribe to [`Event`]s published by this service
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Local path of a cached original (`height == None`) or variant
    pub fn cover_path(
        &self,
        kind: EntityKind,
        id: EntityId,
        asset: AssetKind,
        height: Option<u32>,
    ) -> PathBuf {
        self.paths.cover_path(kind, id, asset, height)
    }

    /// Copies of `assets` with `public_url` pointing at the local cache
    ///
    /// The input is left untouched.
    pub fn annotate(
        &self,
        id: EntityId,
        kind: EntityKind,
        assets: &[AssetDescriptor],
    ) -> Vec<AssetDescriptor> {
        assets
            .iter()
            .map(|asset| AssetDescriptor {
                public_url: Some(self.paths.public_url(kind, id, asset.kind)),
                ..asset.clone()
            })
            .collect()
    }

    /// Dispatch a lifecycle event
    ///
    /// Only deletion can fail; update problems are logged per asset.
    pub async fn handle(&self, event: &LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::EntityUpdated { entity } => {
                self.handle_updated(entity).await;
                Ok(())
            }
            LifecycleEvent::EntityDeleted { entity } => self.handle_deleted(entity).await,
        }
    }

    /// Synchronize all covers of `entity` and its secondary entities
    pub async fn handle_updated(&self, entity: &PrimaryEntity) -> SyncReport {
        let mut report = SyncReport::default();
        let owner = entity.to_string();

        for asset in &entity.images {
            self.sync_asset(EntityKind::Primary, entity.id, &owner, asset, &mut report)
                .await;
        }

        match self.secondaries.secondary_entities(entity.id).await {
            Ok(secondaries) => {
                for secondary in secondaries {
                    let owner = secondary.to_string();
                    for asset in secondary.images.iter().filter(|a| a.kind == AssetKind::Cover) {
                        self.sync_asset(
                            EntityKind::Secondary,
                            secondary.id,
                            &owner,
                            asset,
                            &mut report,
                        )
                        .await;
                    }
                }
            }
            Err(e) => {
                warn!(entity_id = %entity.id, error = %e, "couldn't list albums for {}", entity);
            }
        }

        debug!(
            entity_id = %entity.id,
            fresh = report.fresh,
            downloaded = report.downloaded,
            failed = report.failed,
            "cover sync finished for {}",
            entity
        );

        self.event_tx
            .send(Event::CoversUpdated {
                entity_id: entity.id,
                name: entity.name.clone(),
            })
            .ok();

        report
    }

    /// Remove the cache directory of a deleted primary entity
    pub async fn handle_deleted(&self, entity: &PrimaryEntity) -> Result<()> {
        let root = self.paths.entity_root(EntityKind::Primary, entity.id);

        if tokio::fs::try_exists(&root).await? {
            tokio::fs::remove_dir_all(&root).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to delete cover folder '{}': {}", root.display(), e),
                ))
            })?;
            info!(entity_id = %entity.id, path = %root.display(), "deleted covers for {}", entity);
        }

        Ok(())
    }

    async fn sync_asset(
        &self,
        kind: EntityKind,
        id: EntityId,
        owner: &str,
        asset: &AssetDescriptor,
        report: &mut SyncReport,
    ) {
        let outcome = self.refresh_original(kind, id, owner, asset).await;
        report.record(outcome);

        // Only a new original makes existing variants stale
        let force_all = outcome == AssetOutcome::Downloaded;
        let summary = self
            .variants
            .ensure_variants(kind, id, asset.kind, force_all)
            .await;
        report.variants_generated += summary.generated;
        report.variants_failed += summary.failed;
    }

    async fn refresh_original(
        &self,
        kind: EntityKind,
        id: EntityId,
        owner: &str,
        asset: &AssetDescriptor,
    ) -> AssetOutcome {
        let destination = self.paths.cover_path(kind, id, asset.kind, None);

        let remote_modified = match probe_last_modified(self.remote.as_ref(), &asset.remote_url).await
        {
            Ok(modified) => modified,
            Err(e) => {
                log_failure(&e, owner, asset);
                return AssetOutcome::ProbeFailed;
            }
        };

        if is_fresh(remote_modified, &destination) {
            return AssetOutcome::Fresh;
        }

        info!(
            entity_id = %id,
            asset = %asset.kind,
            url = %asset.remote_url,
            "Downloading {} for {}",
            asset.kind,
            owner
        );

        match self
            .fetcher
            .fetch(&asset.remote_url, &destination, remote_modified)
            .await
        {
            Ok(()) => AssetOutcome::Downloaded,
            Err(e) => {
                log_failure(&e, owner, asset);
                AssetOutcome::FetchFailed
            }
        }
    }
}

fn log_failure(err: &Error, owner: &str, asset: &AssetDescriptor) {
    if err.is_network() {
        warn!(
            asset = %asset.kind,
            url = %asset.remote_url,
            "Couldn't download media cover for {}. {}",
            owner,
            err
        );
    } else {
        error!(
            asset = %asset.kind,
            url = %asset.remote_url,
            error = %err,
            "Couldn't download media cover for {}",
            owner
        );
    }
}
