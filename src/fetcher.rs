//! Cover download with modification-time stamping

use crate::error::Result;
use crate::remote::RemoteSource;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Downloads covers and stamps them with the remote modification time
///
/// The cached file's mtime is what later freshness checks compare against, so
/// it must carry the remote timestamp rather than the local download time.
#[derive(Clone)]
pub struct AssetFetcher {
    remote: Arc<dyn RemoteSource>,
}

impl AssetFetcher {
    /// Create a fetcher using `remote` for transfers
    pub fn new(remote: Arc<dyn RemoteSource>) -> Self {
        Self { remote }
    }

    /// Download `url` to `destination` and stamp it with `remote_modified`.
    ///
    /// A download failure is returned. A stamping failure is only logged: the
    /// file is still valid, it will just look stale on the next check and be
    /// fetched again.
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        remote_modified: DateTime<Utc>,
    ) -> Result<()> {
        self.remote.download(url, destination).await?;

        if let Err(e) = stamp_modified(destination, remote_modified).await {
            debug!(
                path = %destination.display(),
                error = %e,
                "unable to set modified date on cached cover"
            );
        }

        Ok(())
    }
}

/// Set a file's modification time
pub async fn stamp_modified(path: &Path, modified: DateTime<Utc>) -> std::io::Result<()> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::File::options()
            .write(true)
            .open(&path)?
            .set_modified(modified.into())
    })
    .await
    .map_err(std::io::Error::other)?
}
