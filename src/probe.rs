//! Remote modified-time probing

use crate::error::Result;
use crate::remote::RemoteSource;
use chrono::{DateTime, Utc};

/// Ask the remote host when `url` last changed.
///
/// Hosts that do not send `Last-Modified` get the current time instead, which is
/// newer than any cached copy and therefore forces a refresh. Network failures
/// are returned to the caller untouched; nothing is retried here.
pub async fn probe_last_modified(remote: &dyn RemoteSource, url: &str) -> Result<DateTime<Utc>> {
    Ok(remote.last_modified(url).await?.unwrap_or_else(Utc::now))
}
