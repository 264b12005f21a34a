//! # media-cover-sync
//!
//! Local cache for remote cover art. On entity lifecycle events it downloads
//! covers that changed upstream, keeps resized variants next to each original,
//! and hands out public URLs that change whenever the cached file does.
//!
//! ## Design
//!
//! - **Freshness by mtime** - a cached original carries the remote
//!   `Last-Modified` as its modification time; nothing is downloaded twice
//! - **Best-effort** - one failing cover never blocks the rest of an entity
//! - **Pluggable** - network, resizing and album lookup sit behind traits
//! - **Event-driven** - consumers subscribe to [`Event::CoversUpdated`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_cover_sync::{
//!     AssetDescriptor, AssetKind, Config, EntityId, LifecycleEvent, MediaCoverService,
//!     PrimaryEntity, Result, SecondaryEntity, SecondaryEntityProvider,
//! };
//! use std::sync::Arc;
//!
//! struct NoAlbums;
//!
//! #[async_trait::async_trait]
//! impl SecondaryEntityProvider for NoAlbums {
//!     async fn secondary_entities(&self, _id: EntityId) -> Result<Vec<SecondaryEntity>> {
//!         Ok(vec![])
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config {
//!         cover_root: "/var/lib/covers".into(),
//!         ..Default::default()
//!     };
//!     let service = MediaCoverService::new(&config, Arc::new(NoAlbums))?;
//!
//!     let artist = PrimaryEntity {
//!         id: EntityId(42),
//!         name: "Portishead".into(),
//!         images: vec![AssetDescriptor::new(
//!             AssetKind::Poster,
//!             "https://images.example.com/portishead/poster.jpg",
//!         )],
//!     };
//!     service.handle(&LifecycleEvent::EntityUpdated { entity: artist }).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Cover download and timestamp stamping
pub mod fetcher;
/// Cache freshness checks
pub mod freshness;
/// Cache layout and public URLs
pub mod paths;
/// Remote modified-time probing
pub mod probe;
/// Remote cover sources
pub mod remote;
/// Resized variants
pub mod resize;
/// Event-driven cover synchronization
pub mod service;
/// Core types and events
pub mod types;
/// Background event worker
pub mod worker;

// Re-export commonly used types
pub use config::{Config, HttpConfig, WorkerConfig};
pub use error::{Error, Result};
pub use paths::PathResolver;
pub use remote::{HttpRemoteSource, RemoteSource};
pub use resize::{ImageCrateResizer, ImageResizer, VariantSummary};
pub use service::{MediaCoverService, SecondaryEntityProvider, SyncReport};
pub use types::{
    AssetDescriptor, AssetKind, EntityId, EntityKind, Event, LifecycleEvent, PrimaryEntity,
    SecondaryEntity,
};
pub use worker::{CoverSyncHandle, CoverSyncWorker};

/// Run a worker until SIGTERM/SIGINT (Ctrl+C elsewhere), then drain it.
///
/// Intake stops on the signal; events already being processed are allowed to
/// finish before this returns.
pub async fn run_with_shutdown(handle: CoverSyncHandle, worker: CoverSyncWorker) -> Result<()> {
    let task = tokio::spawn(worker.run());
    wait_for_signal().await;
    handle.shutdown();
    task.await
        .map_err(|e| Error::Other(format!("cover sync worker panicked: {}", e)))
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (term, int) => {
            if let Err(e) = term.as_ref().and(int.as_ref()) {
                tracing::warn!(error = %e, "Could not register all signal handlers, falling back to ctrl_c");
            }
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
